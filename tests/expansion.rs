//! End-to-end tests: definition text in, rendered content and stops out

use pretty_assertions::assert_eq;

use snips::{
    expand, Direction, ExpandRequest, JumpPosition, Library, RenderContext, Session, Snippet,
};

fn session(body: &str) -> Session {
    Session::expand(&Snippet::new("t", "", "", body), RenderContext::default())
        .expect("Should expand")
}

fn position(p: JumpPosition) -> (i64, i64, i64) {
    (p.line, p.col, p.length)
}

#[test]
fn test_hello_world() {
    let source = "snippet foo \"desc\" b\nHello ${1:world}!\nendsnippet\n";
    let expansion = expand(source, "foo").unwrap().expect("Should match");
    insta::assert_snapshot!(expansion.content, @"Hello world!");
    assert_eq!(position(expansion.position), (0, 6, 5));
}

#[test]
fn test_literal_template() {
    let s = session("nothing to see here");
    assert_eq!(s.content(), "nothing to see here");
    assert!(s.stops().is_empty());
    assert_eq!(s.expansion().position, JumpPosition::NONE);
}

#[test]
fn test_mirror_shares_canonical_value() {
    let s = session("${1:a}${1}");
    assert_eq!(s.content(), "aa");
    assert_eq!(s.stops(), &[1]);
}

#[test]
fn test_transformation_without_match_is_empty() {
    let s = session("${1:abc}<${1/xyz/Q/}>");
    assert_eq!(s.content(), "abc<>");
}

#[test]
fn test_case_directives() {
    let s = session(r"${1:hello} ${1/(.*)/\u$1/}");
    assert_eq!(s.content(), "hello Hello");

    let s = session(r"${1:ab} ${1/(.*)/\U$1\E-rest/}");
    assert_eq!(s.content(), "ab AB-rest");
}

#[test]
fn test_conditional_replacement() {
    let s = session("${1:abc} ${1/(a)?.*/(?1:yes:no)/}");
    assert_eq!(s.content(), "abc yes");

    let s = session("${1:xyz} ${1/(a)?.*/(?1:yes:no)/}");
    assert_eq!(s.content(), "xyz no");
}

#[test]
fn test_escaped_newline_in_replacement_stays_literal() {
    let s = session(r"${1:a} ${1/a/x\ny/}");
    assert_eq!(s.content(), r"a x\ny");
    assert_eq!(s.content().lines().count(), 1);
}

#[test]
fn test_three_backward_jumps_cycle() {
    let mut s = session("${1:a} ${2:b} ${3:c}");
    let start = s.jump_position();
    s.jump(Direction::Backward);
    s.jump(Direction::Backward);
    let back = s.jump(Direction::Backward);
    assert_eq!(back, start);
    assert_eq!(s.current_stop(), Some(1));
}

#[test]
fn test_forward_jumps_visit_zero_last() {
    let mut s = session("for ${1:i} in ${2:xs}:\n\t${0:pass}");
    assert_eq!(s.current_stop(), Some(1));
    assert_eq!(position(s.jump(Direction::Forward)), (0, 9, 2));
    assert_eq!(position(s.jump(Direction::Forward)), (1, 4, 4));
    assert_eq!(s.current_stop(), Some(0));
    assert_eq!(position(s.jump(Direction::Forward)), (0, 4, 1));
}

#[test]
fn test_rerender_supersedes() {
    let mut twice = session("${1:a}-${2:b}-$1");
    twice.rerender("x").unwrap();
    let twice = twice.rerender("xy").unwrap().unwrap();

    let mut once = session("${1:a}-${2:b}-$1");
    let once = once.rerender("xy").unwrap().unwrap();

    assert_eq!(twice, once);
    insta::assert_snapshot!(once.content, @"xy-b-xy");
}

#[test]
fn test_edit_drops_nested_stop() {
    let mut s = session("${1:outer ${2:inner}} ${3:last}");
    assert_eq!(s.stops(), &[1, 2, 3]);
    let expansion = s.rerender("typed").unwrap().unwrap();
    assert_eq!(s.stops(), &[1, 3]);
    assert_eq!(expansion.content, "typed last");
    assert_eq!(
        expansion.position,
        JumpPosition {
            line: 0,
            orig_col: 0,
            col: 5,
            length: 0
        }
    );
    assert_eq!(position(s.jump(Direction::Forward)), (0, 6, 4));
}

#[test]
fn test_block_snippet_indentation() {
    let source = "\
snippet if \"if\" b
if ${1:cond}:
\t${2:pass}
endsnippet
";
    let mut library = Library::new();
    library.add_source("python", source, "python.snippets").unwrap();

    let context = RenderContext::default().with_shiftwidth(4).with_indent(4);
    let request = ExpandRequest::at_end("    if", "python").with_context(context);
    let mut s = library.expand(&request).unwrap().expect("Should match");

    assert_eq!(s.content(), "    if cond:\n        pass");
    assert_eq!(position(s.jump_position()), (0, 7, 4));
    assert_eq!(position(s.jump(Direction::Forward)), (1, 8, 4));
}

#[test]
fn test_visual_selection() {
    let mut library = Library::new();
    library
        .add_source("all", "snippet q\n\"${VISUAL:empty}\"$0\nendsnippet\n", "all.snippets")
        .unwrap();

    let request = ExpandRequest::at_end("q", "rust")
        .with_context(RenderContext::default().with_visual("picked"));
    let s = library.expand(&request).unwrap().unwrap();
    assert_eq!(s.content(), "\"picked\"");
    assert_eq!(s.stops(), &[0]);

    let s = library.expand(&ExpandRequest::at_end("q", "rust")).unwrap().unwrap();
    assert_eq!(s.content(), "\"empty\"");
}

#[test]
fn test_unterminated_interpolation_is_text() {
    let s = session("cost: `5 ${1:x}");
    assert_eq!(s.content(), "cost: `5 x");
}

#[cfg(unix)]
#[test]
fn test_shell_interpolation() {
    let s = session("year `echo 2024` ${1:x}");
    assert_eq!(s.content(), "year 2024 x");
    assert_eq!(position(s.jump_position()), (0, 10, 1));
}
