use assert_cmd::Command;
use std::io::Write;

fn treelox() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("treelox"))
}

fn source_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn runs_file_successfully() {
    let file = source_file("var greeting = \"hi\";\nprint greeting + \"!\";\n");

    treelox()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("hi!\n");
}

#[test]
fn tokenizes_file() {
    let file = source_file("(1 + x)");

    treelox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            "LEFT_PAREN ( null\nNUMBER 1 1.0\nPLUS + null\nIDENTIFIER x null\nRIGHT_PAREN ) null\nEOF  null\n",
        );
}

#[test]
fn tokenize_reports_every_bad_character_and_keeps_going() {
    let file = source_file("@ 1 #");

    treelox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicates::str::contains("NUMBER 1 1.0"))
        .stderr(predicates::str::contains("Unexpected character: @"))
        .stderr(predicates::str::contains("Unexpected character: #"));
}

#[test]
fn tokenize_json_lists_tokens() {
    let file = source_file("nil");

    treelox()
        .args(["tokenize", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("\"lexeme\": \"nil\""));
}

#[test]
fn parses_expression() {
    let file = source_file("-(1.5 + 2) * 3");

    treelox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout("(* (- (group (+ 1.5 2.0))) 3.0)\n");
}

#[test]
fn parse_error_exits_65() {
    let file = source_file("(1 + 2");

    treelox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Error at end: Expect ')' after expression."));
}

#[test]
fn evaluates_expression() {
    let file = source_file("\"con\" + \"cat\" == \"concat\"");

    treelox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn evaluate_runtime_error_exits_70() {
    let file = source_file("-\"oops\"");

    treelox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicates::str::contains("Operand must be a number."));
}

#[test]
fn resolution_error_exits_66_without_running() {
    let file = source_file("print \"side effect\";\n{ var a = a; }\n");

    treelox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(66)
        .stdout(predicates::str::is_empty())
        .stderr(predicates::str::contains(
            "[line 2] Error at 'a': Can't read local variable in its own initializer.",
        ));
}

#[test]
fn runtime_error_exits_70_after_earlier_output() {
    let file = source_file("print 1;\nprint missing;\n");

    treelox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("1\n")
        .stderr(predicates::str::contains("Undefined variable 'missing'.\n[line 2]"));
}

#[test]
fn empty_file_runs_cleanly() {
    let file = source_file("");

    treelox().arg("run").arg(file.path()).assert().success().stdout("");
}

#[test]
fn missing_file_exits_74() {
    treelox()
        .args(["run", "no_such_file.lox"])
        .assert()
        .code(74)
        .stderr(predicates::str::contains("Failed to open file"));
}

#[test]
fn missing_filename_is_not_an_error() {
    treelox()
        .arg("run")
        .assert()
        .success()
        .stdout(predicates::str::contains("No input filepath was provided."));
}

#[test]
fn deep_recursion_runs_without_crashing() {
    let file = source_file(
        "fun depth(n) {\n  if (n <= 0) return 0;\n  return 1 + depth(n - 1);\n}\nprint depth(4000);\n",
    );

    treelox()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("4000\n");
}

#[test]
fn runaway_recursion_exits_70() {
    let file = source_file("fun forever() {\n  return forever();\n}\nforever();\n");

    treelox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicates::str::contains("Stack overflow.\n[line 2]"));
}
