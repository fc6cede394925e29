fn run(source: &str) -> Result<String, interpreter::BlockError> {
    let code: Vec<String> = source.lines().map(str::to_string).collect();
    interpreter::run_block(&[], &code)
}

fn run_trimmed(source: &str) -> String {
    run(source).expect("execution failed").trim().to_string()
}

fn run_err(source: &str) -> String {
    run(source).expect_err("execution succeeded").to_string()
}

#[test]
fn arithmetic() {
    assert_eq!(run_trimmed("print(2 + 3)"), "5");
    assert_eq!(run_trimmed("print(10 - 4)"), "6");
    assert_eq!(run_trimmed("print(3 * 7)"), "21");
    assert_eq!(run_trimmed("print(15 / 3)"), "5.0");
    assert_eq!(run_trimmed("print(10 % 3)"), "1");
    assert_eq!(run_trimmed("print(7 // 2)"), "3");
    assert_eq!(run_trimmed("print(2 ** 10)"), "1024");
}

#[test]
fn python_division_semantics() {
    assert_eq!(run_trimmed("print(-7 // 2)"), "-4");
    assert_eq!(run_trimmed("print(-7 % 3)"), "2");
    assert_eq!(run_trimmed("print(7 % -3)"), "-2");
    assert_eq!(run_trimmed("print(1 / 4)"), "0.25");
    assert_eq!(run_trimmed("print(2 ** -1)"), "0.5");
}

#[test]
fn operator_precedence() {
    assert_eq!(run_trimmed("print(2 + 3 * 4)"), "14");
    assert_eq!(run_trimmed("print((2 + 3) * 4)"), "20");
    assert_eq!(run_trimmed("print(-2 ** 2)"), "-4");
    assert_eq!(run_trimmed("print(2 ** 3 ** 2)"), "512");
}

#[test]
fn boolean_logic() {
    assert_eq!(run_trimmed("print(True and False)"), "False");
    assert_eq!(run_trimmed("print(True or False)"), "True");
    assert_eq!(run_trimmed("print(not True)"), "False");
    assert_eq!(run_trimmed("print(0 or 'fallback')"), "fallback");
    assert_eq!(run_trimmed("print(5 == 5.0)"), "True");
    assert_eq!(run_trimmed("print(3 > 5)"), "False");
    assert_eq!(run_trimmed("print(3 <= 3)"), "True");
}

#[test]
fn membership() {
    assert_eq!(run_trimmed("print(2 in [1, 2, 3])"), "True");
    assert_eq!(run_trimmed("print('z' not in 'abc')"), "True");
}

#[test]
fn variables_and_assignment() {
    assert_eq!(run_trimmed("x = 42\nprint(x)"), "42");
    assert_eq!(run_trimmed("x = 5\ny = 10\nprint(x + y)"), "15");
    assert_eq!(run_trimmed("n = 1\nn += 4\nn *= 3\nprint(n)"), "15");
}

#[test]
fn string_operations() {
    assert_eq!(run_trimmed("print('foo' + \"bar\")"), "foobar");
    assert_eq!(run_trimmed("print('ab' * 3)"), "ababab");
    assert_eq!(run_trimmed("print('hello'[1])"), "e");
    assert_eq!(run_trimmed("print('hello'[-1])"), "o");
    assert_eq!(run_trimmed("print(len('héllo'))"), "5");
}

#[test]
fn conditional_expression() {
    assert_eq!(run_trimmed("x = 3\nprint('big' if x > 2 else 'small')"), "big");
    assert_eq!(run_trimmed("x = 1\nprint('big' if x > 2 else 'small')"), "small");
}

#[test]
fn lists() {
    assert_eq!(run_trimmed("xs = [3, 1, 2]\nprint(xs)"), "[3, 1, 2]");
    assert_eq!(run_trimmed("print(sorted([3, 1, 2]))"), "[1, 2, 3]");
    assert_eq!(run_trimmed("print(sorted([3, 1, 2], reverse=True))"), "[3, 2, 1]");
    assert_eq!(run_trimmed("print(['a', 1, None])"), "['a', 1, None]");
    assert_eq!(run_trimmed("print(sum(range(5)))"), "10");
    assert_eq!(run_trimmed("print(max([4, 9, 2]), min(4, 9, 2))"), "9 2");
}

#[test]
fn fstrings() {
    assert_eq!(run_trimmed("name = 'Ada'\nprint(f'hi {name}!')"), "hi Ada!");
    assert_eq!(run_trimmed("x = 3.14159\nprint(f\"{x:.2f}\")"), "3.14");
    assert_eq!(run_trimmed("print(f'{1234567:,}')"), "1,234,567");
    assert_eq!(run_trimmed("print(f'{\"s\"!r}')"), "'s'");
    assert_eq!(run_trimmed("print(f'{{literal}}')"), "{literal}");
}

#[test]
fn builtins() {
    assert_eq!(run_trimmed("print(int('7') + 1)"), "8");
    assert_eq!(run_trimmed("print(str(3) + 'x')"), "3x");
    assert_eq!(run_trimmed("print(abs(-4), round(2.675, 2))"), "4 2.67");
    assert_eq!(run_trimmed("print(type(1.0))"), "<class 'float'>");
    assert_eq!(run_trimmed("print(bool(''), bool([0]))"), "False True");
}

#[test]
fn methods() {
    assert_eq!(run_trimmed("print('Marp'.upper())"), "MARP");
    assert_eq!(run_trimmed("print(', '.join(['a', 'b']))"), "a, b");
    assert_eq!(run_trimmed("print('a b  c'.split())"), "['a', 'b', 'c']");
    assert_eq!(run_trimmed("print('slide'.replace('s', 'g'))"), "glide");
    assert_eq!(run_trimmed("print([1, 2, 1].count(1))"), "2");
}

#[test]
fn print_arguments() {
    assert_eq!(run_trimmed("print('a', 'b', sep='-')"), "a-b");
    assert_eq!(run_trimmed("print('a', end='')\nprint('b')"), "ab");
    assert_eq!(run_trimmed("print()\nprint('x')"), "x");
}

#[test]
fn multiple_prints() {
    assert_eq!(run_trimmed("print(1)\nprint(2)"), "1\n2");
}

#[test]
fn trailing_whitespace_is_trimmed() {
    assert_eq!(run("print('x  ')\nprint()").unwrap(), "x");
}

#[test]
fn runtime_errors() {
    assert_eq!(run_err("print(missing)"), "NameError: name 'missing' is not defined");
    assert_eq!(run_err("print(1 / 0)"), "ZeroDivisionError: division by zero");
    assert_eq!(
        run_err("print(1 + 'a')"),
        "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
    );
    assert_eq!(run_err("print([1][5])"), "IndexError: list index out of range");
    assert_eq!(run_err("print(2 ** 64)"), "OverflowError: integer overflow");
    assert_eq!(run_err("print('x'.nope())"), "AttributeError: 'str' object has no attribute 'nope'");
}

#[test]
fn shadowed_builtin_is_not_callable() {
    assert_eq!(run_err("print = 1\nprint(2)"), "TypeError: 'int' object is not callable");
}

#[test]
fn syntax_errors_report_the_line() {
    let err = run("x = 1\nprint(x +)").unwrap_err();
    assert_eq!(err.line, "print(x +)");
    assert!(err.to_string().starts_with("SyntaxError:"));
}

#[test]
fn blocks_do_not_share_state() {
    run("shared = 1").unwrap();
    assert_eq!(run_err("print(shared)"), "NameError: name 'shared' is not defined");
}
