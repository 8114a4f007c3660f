use pasfix::autofix::{compute_fix, AutoFix};
use pasfix::edit::{CompletionHint, EditableBuffer, SourceBuffer};
use pasfix::fault::{Access, DefineKind, Fault, GroupingKind, LineInfo, Scope};
use pretty_assertions::assert_eq;

fn run(text: &str, fault: &Fault) -> (bool, SourceBuffer) {
    let mut buffer = SourceBuffer::new(text);
    let changed = AutoFix::new(&mut buffer).fix(fault);
    (changed, buffer)
}

fn unknown(line: usize, column: usize, name: &str, fit: DefineKind) -> Fault {
    Fault::UnknownIdentifier {
        scope: Scope::program(),
        at: LineInfo::new(line, column),
        name: name.into(),
        fit,
    }
}

#[test]
fn unknown_variable_gets_var_section_after_program() {
    let (changed, buffer) = run(
        "program P; begin x := 1; end.",
        &unknown(0, 11, "x", DefineKind::Var),
    );
    assert!(changed);
    assert_eq!(buffer.text(), "program P;\nvar\n    x: ;\n begin x := 1; end.");
    assert_eq!(buffer.selection(), 22..22);
    assert_eq!(buffer.hint(), Some(CompletionHint::DataType));
    assert!(buffer.is_focused());
}

#[test]
fn var_section_prefers_uses_clause_over_program() {
    let (_, buffer) = run(
        "program P;\nuses crt;\nbegin\n  x := 1;\nend.",
        &unknown(3, 2, "x", DefineKind::Var),
    );
    assert_eq!(
        buffer.text(),
        "program P;\nuses crt;\nvar\n    x: ;\n\nbegin\n  x := 1;\nend."
    );
    assert_eq!(buffer.selection(), 32..32);
}

#[test]
fn var_section_without_any_anchor_goes_first() {
    let (_, buffer) = run("x := 1;", &unknown(0, 0, "x", DefineKind::Var));
    assert_eq!(buffer.text(), "\nvar\n    x: ;\nx := 1;");
    assert_eq!(buffer.selection(), 12..12);
}

#[test]
fn local_variable_goes_after_routine_header() {
    let fault = Fault::UnknownIdentifier {
        scope: Scope {
            start: LineInfo::new(2, 0),
            function: None,
        },
        at: LineInfo::new(4, 2),
        name: "t".into(),
        fit: DefineKind::Var,
    };
    let (_, buffer) = run(
        "program P;\n\nprocedure Q(var a: integer);\nbegin\n  t := a;\nend;\n\nbegin\nend.",
        &fault,
    );
    assert_eq!(
        buffer.text(),
        "program P;\n\nprocedure Q(var a: integer);\nvar\n    t: ;\n\nbegin\n  t := a;\nend;\n\nbegin\nend."
    );
    assert_eq!(buffer.selection(), 52..52);
}

#[test]
fn local_constant_skips_const_parameter() {
    let fault = Fault::UnknownIdentifier {
        scope: Scope::function(LineInfo::new(2, 0), "F"),
        at: LineInfo::new(4, 11),
        name: "k".into(),
        fit: DefineKind::Const,
    };
    let (_, buffer) = run(
        "program P;\n\nfunction F(const c: integer): integer;\nbegin\n  F := c + k;\nend;\n\nbegin\nend.",
        &fault,
    );
    assert_eq!(
        buffer.text(),
        "program P;\n\nfunction F(const c: integer): integer;\nconst\n    k = ;\n\nbegin\n  F := c + k;\nend;\n\nbegin\nend."
    );
    assert_eq!(buffer.selection(), 65..65);
}

#[test]
fn keyword_in_comment_is_not_a_section() {
    let (_, buffer) = run(
        "program P;\n{ declare var here }\nbegin\n  t := 1;\nend.",
        &unknown(3, 2, "t", DefineKind::Var),
    );
    assert_eq!(
        buffer.text(),
        "program P;\nvar\n    t: ;\n\n{ declare var here }\nbegin\n  t := 1;\nend."
    );
    assert_eq!(buffer.selection(), 22..22);
}

#[test]
fn unknown_constant_joins_existing_section() {
    let (_, buffer) = run(
        "program P;\nconst\n  a = 1;\nbegin\n  writeln(b);\nend.",
        &unknown(4, 10, "b", DefineKind::Const),
    );
    assert_eq!(
        buffer.text(),
        "program P;\nconst\n    b = ;\n  a = 1;\nbegin\n  writeln(b);\nend."
    );
    assert_eq!(buffer.selection(), 25..25);
}

#[test]
fn unknown_function_gets_stub_before_main_block() {
    let (_, buffer) = run(
        "program P;\nbegin\n  x := Twice(2);\nend.",
        &unknown(2, 7, "Twice", DefineKind::Function),
    );
    assert_eq!(
        buffer.text(),
        "program P;\nfunction Twice: ;\nbegin\nend;\n\nbegin\n  x := Twice(2);\nend."
    );
    assert_eq!(buffer.selection(), 27..27);
}

#[test]
fn unknown_procedure_is_left_alone() {
    let src = "program P;\nbegin\n  Go;\nend.";
    let (changed, buffer) = run(src, &unknown(2, 2, "Go", DefineKind::Procedure));
    assert!(!changed);
    assert_eq!(buffer.text(), src);
    assert!(!buffer.is_focused());
}

#[test]
fn missing_type_opens_type_section() {
    let fault = Fault::TypeIdentifierExpected {
        scope: Scope::program(),
        at: LineInfo::new(2, 5),
        missing_type: "TPoint".into(),
    };
    let (_, buffer) = run("program P;\nvar\n  p: TPoint;\nbegin\nend.", &fault);
    assert_eq!(
        buffer.text(),
        "program P;\ntype\n    TPoint = ;\n\nvar\n  p: TPoint;\nbegin\nend."
    );
    let cursor = buffer.selection().start;
    assert!(buffer.text()[..cursor].ends_with("TPoint = "));
}

#[test]
fn missing_type_joins_existing_section() {
    let fault = Fault::TypeIdentifierExpected {
        scope: Scope::program(),
        at: LineInfo::new(3, 5),
        missing_type: "B".into(),
    };
    let (_, buffer) = run("type\n  A = integer;\nvar\n  b: B;", &fault);
    assert_eq!(buffer.text(), "type\n    B = ;\n  A = integer;\nvar\n  b: B;");
}

#[test]
fn unconvertible_variable_takes_value_type() {
    let fault = Fault::UnconvertibleType {
        scope: Scope::program(),
        at: LineInfo::new(4, 2),
        identifier: Some(Access::variable("s")),
        value: Some(Access::other()),
        value_type: "integer".into(),
        target_type: "string".into(),
    };
    let (_, buffer) = run("program P;\nvar\n  s: string;\nbegin\n  s := 1;\nend.", &fault);
    assert_eq!(
        buffer.text(),
        "program P;\nvar\n  s: integer;\nbegin\n  s := 1;\nend."
    );
    assert_eq!(buffer.selected_text(), "integer");
}

#[test]
fn function_result_changes_return_type() {
    let fault = Fault::UnconvertibleType {
        scope: Scope::function(LineInfo::new(0, 0), "F"),
        at: LineInfo::new(2, 2),
        identifier: Some(Access::variable("f")),
        value: None,
        value_type: "string".into(),
        target_type: "integer".into(),
    };
    let (_, buffer) = run("function F: integer;\nbegin\n  f := 'x';\nend;", &fault);
    assert_eq!(buffer.text(), "function F: string;\nbegin\n  f := 'x';\nend;");
    assert_eq!(buffer.selected_text(), "string");
}

#[test]
fn unconvertible_constant_value_takes_target_type() {
    let fault = Fault::UnconvertibleType {
        scope: Scope::program(),
        at: LineInfo::new(3, 2),
        identifier: Some(Access::other()),
        value: Some(Access::constant("k")),
        value_type: "integer".into(),
        target_type: "real".into(),
    };
    let (_, buffer) = run("const\n  k: integer = 1;\nbegin\n  r := k;\nend.", &fault);
    assert_eq!(buffer.text(), "const\n  k: real = 1;\nbegin\n  r := k;\nend.");
}

#[test]
fn unconvertible_variable_ignores_same_named_parameter() {
    let fault = Fault::UnconvertibleType {
        scope: Scope::program(),
        at: LineInfo::new(9, 2),
        identifier: Some(Access::variable("s")),
        value: Some(Access::other()),
        value_type: "integer".into(),
        target_type: "string".into(),
    };
    let src = "program P;\nprocedure Q(var s: integer);\nbegin\nend;\n\nvar\n  s: string;\n\nbegin\n  s := 1;\nend.";
    let (_, buffer) = run(src, &fault);
    assert_eq!(
        buffer.text(),
        "program P;\nprocedure Q(var s: integer);\nbegin\nend;\n\nvar\n  s: integer;\n\nbegin\n  s := 1;\nend."
    );
    assert_eq!(buffer.selected_text(), "integer");
}

#[test]
fn unconvertible_without_declaration_is_noop() {
    let fault = Fault::UnconvertibleType {
        scope: Scope::program(),
        at: LineInfo::new(1, 2),
        identifier: Some(Access::variable("ghost")),
        value: None,
        value_type: "integer".into(),
        target_type: "string".into(),
    };
    assert_eq!(compute_fix("begin\n  ghost := 1;\nend.", &fault), None);
}

#[test]
fn missing_token_is_inserted_and_selected() {
    let fault = Fault::MissingToken {
        at: LineInfo::new(1, 8),
        token: ";".into(),
    };
    let (_, buffer) = run("begin\n  x := 1\nend.", &fault);
    assert_eq!(buffer.text(), "begin\n  x := 1;\nend.");
    assert_eq!(buffer.selection(), 14..15);
}

#[test]
fn assigned_constant_becomes_variable() {
    let fault = Fault::ChangeValueOfConstant {
        scope: Scope::program(),
        at: LineInfo::new(6, 2),
        name: "max".into(),
        value: None,
        value_type: Some("integer".into()),
    };
    let src = "program P;\nconst\n  max = 10;\nvar\n  i: integer;\nbegin\n  max := 5;\nend.";
    let (_, buffer) = run(src, &fault);
    assert_eq!(
        buffer.text(),
        "program P;\nvar\n    max: integer = 10;\n  i: integer;\nbegin\n  max := 5;\nend."
    );
    assert_eq!(buffer.selected_text(), "integer");
}

#[test]
fn assigned_constant_keeps_sibling_constants() {
    let fault = Fault::ChangeValueOfConstant {
        scope: Scope::program(),
        at: LineInfo::new(5, 2),
        name: "max".into(),
        value: None,
        value_type: Some("integer".into()),
    };
    let src = "program P;\nconst\n  max = 10;\n  min = 0;\nbegin\n  max := 5;\nend.";
    let (_, buffer) = run(src, &fault);
    assert_eq!(
        buffer.text(),
        "program P;\nvar\n    max: integer = 10;\n\nconst\n  min = 0;\nbegin\n  max := 5;\nend."
    );
}

#[test]
fn unterminated_begin_gets_end() {
    let fault = Fault::Grouping {
        at: LineInfo::new(0, 0),
        grouping: GroupingKind::UnfinishedBeginEnd,
    };
    let (_, buffer) = run("begin\n  x := 1;", &fault);
    assert_eq!(buffer.text(), "begin\n  x := 1;\nend");
    assert_eq!(buffer.selected_text(), "end");

    let other = Fault::Grouping {
        at: LineInfo::new(0, 0),
        grouping: GroupingKind::MismatchedParens,
    };
    assert_eq!(compute_fix("x := (1;", &other), None);
}

#[test]
fn missing_program_block_is_appended() {
    let (_, buffer) = run("program P;", &Fault::ProgramNotFound);
    assert_eq!(buffer.text(), "program P;\nbegin\n    \nend.\n");
    assert_eq!(buffer.selection(), 21..21);
}

#[test]
fn expected_token_replaces_or_inserts() {
    let replace = Fault::ExpectedToken {
        at: LineInfo::new(0, 0),
        current: "=".into(),
        expected: ":=".into(),
        insert: false,
    };
    let (_, buffer) = run("x = 1;", &replace);
    assert_eq!(buffer.text(), "x := 1;");
    assert_eq!(buffer.selected_text(), ":=");

    let insert = Fault::ExpectedToken {
        at: LineInfo::new(0, 10),
        current: "b".into(),
        expected: ",".into(),
        insert: true,
    };
    let (_, buffer) = run("writeln(a b);", &insert);
    assert_eq!(buffer.text(), "writeln(a  , b);");
    assert_eq!(buffer.selected_text(), " , ");
}

#[test]
fn expected_token_only_searches_its_line() {
    let fault = Fault::ExpectedToken {
        at: LineInfo::new(0, 0),
        current: "=".into(),
        expected: ":=".into(),
        insert: false,
    };
    assert_eq!(compute_fix("x;\ny = 1;", &fault), None);
}

#[test]
fn json_payload_drives_the_fix() {
    let fault: Fault = serde_json::from_str(
        r#"{"kind":"unknown_identifier","scope":{"start":{"line":0}},"at":{"line":1,"column":2},"name":"n","fit":"var"}"#,
    )
    .unwrap();
    let fix = compute_fix("begin\n  n := 1;\nend.", &fault).unwrap();
    assert_eq!(fix.apply_to("begin\n  n := 1;\nend."), "\nvar\n    n: ;\nbegin\n  n := 1;\nend.");
}
