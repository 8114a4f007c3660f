use tracing::debug;

use crate::fault::{Fault, GroupingKind, LineInfo};
use crate::token::{Token, TokenKind};

fn at(tok: &Token) -> LineInfo {
    LineInfo::new(tok.line.saturating_sub(1), tok.col.saturating_sub(1))
}

// Openers still open at the end are reported at their own position, stray
// closers where they stand. A `program` also needs a top-level `begin ... end.`
pub fn check(tokens: &[Token]) -> Vec<Fault> {
    let mut faults = Vec::new();
    let mut blocks: Vec<&Token> = Vec::new();
    let mut parens: Vec<&Token> = Vec::new();
    let mut main_block = false;
    let mut is_program = false;
    // A unit's closing `end.` has no opener.
    let mut unit_open = false;

    for (i, tok) in tokens.iter().enumerate() {
        let next_is_period = tokens.get(i + 1).is_some_and(|t| t.is(TokenKind::Period));
        match tok.kind {
            TokenKind::Program => {
                is_program = tok.text.eq_ignore_ascii_case("program");
                unit_open = !is_program;
            }
            // The variant part of a record ends with the record's own `end`.
            TokenKind::Case if blocks.last().is_some_and(|open| open.is(TokenKind::Record)) => {}
            TokenKind::Begin | TokenKind::Case | TokenKind::Record | TokenKind::Repeat => {
                blocks.push(tok)
            }
            TokenKind::Word | TokenKind::Interface if closes_with_end(tokens, i) => blocks.push(tok),
            TokenKind::End => match blocks.last() {
                Some(open) if !open.is(TokenKind::Repeat) => {
                    if blocks.len() == 1 && open.is(TokenKind::Begin) && next_is_period {
                        main_block = true;
                    }
                    blocks.pop();
                }
                Some(_) => faults.push(Fault::Grouping {
                    at: at(tok),
                    grouping: GroupingKind::MismatchedBeginEnd,
                }),
                None if unit_open && next_is_period => unit_open = false,
                None => faults.push(Fault::Grouping {
                    at: at(tok),
                    grouping: GroupingKind::ExtraEnd,
                }),
            },
            TokenKind::Until => match blocks.last() {
                Some(open) if open.is(TokenKind::Repeat) => {
                    blocks.pop();
                }
                _ => faults.push(Fault::Grouping {
                    at: at(tok),
                    grouping: GroupingKind::MismatchedBeginEnd,
                }),
            },
            TokenKind::LeftParen | TokenKind::LeftBracket => parens.push(tok),
            TokenKind::RightParen | TokenKind::RightBracket => {
                let opener = if tok.is(TokenKind::RightParen) {
                    TokenKind::LeftParen
                } else {
                    TokenKind::LeftBracket
                };
                if parens.last().is_some_and(|open| open.is(opener)) {
                    parens.pop();
                } else {
                    faults.push(Fault::Grouping {
                        at: at(tok),
                        grouping: bracket_fault(tok.kind),
                    });
                }
            }
            _ => {}
        }
    }

    // An unterminated block is more likely the main block than a missing one.
    let missing_main = is_program && !main_block && blocks.is_empty();
    for open in parens {
        faults.push(Fault::Grouping {
            at: at(open),
            grouping: bracket_fault(open.kind),
        });
    }
    for open in blocks {
        faults.push(Fault::Grouping {
            at: at(open),
            grouping: GroupingKind::UnfinishedBeginEnd,
        });
    }
    if missing_main {
        faults.push(Fault::ProgramNotFound);
    }
    debug!(count = faults.len(), "structure checked");
    faults
}

// `try`, `asm` and class, object or interface type bodies also end with `end`.
fn closes_with_end(tokens: &[Token], i: usize) -> bool {
    let tok = &tokens[i];
    if tok.is(TokenKind::Word)
        && (tok.text.eq_ignore_ascii_case("try") || tok.text.eq_ignore_ascii_case("asm"))
    {
        return true;
    }
    let type_body = tok.is(TokenKind::Interface)
        || tok.text.eq_ignore_ascii_case("class")
        || tok.text.eq_ignore_ascii_case("object");
    let after_equals = i > 0 && tokens[i - 1].text == "=";
    if !type_body || !after_equals {
        return false;
    }
    // Skip the ancestor list: `class(Exception);` is complete without a body.
    let mut j = i + 1;
    if tokens.get(j).is_some_and(|t| t.is(TokenKind::LeftParen)) {
        let mut depth = 0usize;
        while let Some(t) = tokens.get(j) {
            j += 1;
            match t.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => break,
                _ => {}
            }
        }
    }
    // Forward declarations and `class of T` have no body either.
    !tokens
        .get(j)
        .is_some_and(|t| t.is(TokenKind::Semicolon) || t.is(TokenKind::Of))
}

fn bracket_fault(kind: TokenKind) -> GroupingKind {
    match kind {
        TokenKind::LeftBracket | TokenKind::RightBracket => GroupingKind::MismatchedBrackets,
        _ => GroupingKind::MismatchedParens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn faults(src: &str) -> Vec<Fault> {
        check(&Lexer::new(src).lex())
    }

    #[test]
    fn balanced_program_is_clean() {
        let src = "program P;\nbegin\n  case x of\n    1: repeat y until z;\n  end;\nend.";
        assert_eq!(faults(src), vec![]);
    }

    #[test]
    fn unclosed_begin_is_reported_at_opener() {
        let src = "program P;\nbegin\n  if a then\n  begin\n    b;\nend.";
        assert_eq!(
            faults(src),
            vec![Fault::Grouping {
                at: LineInfo::new(1, 0),
                grouping: GroupingKind::UnfinishedBeginEnd,
            }]
        );
    }

    #[test]
    fn program_without_main_block() {
        let src = "program P;\nvar x: integer;\nprocedure Q;\nbegin\nend;";
        assert_eq!(faults(src), vec![Fault::ProgramNotFound]);
    }

    #[test]
    fn units_need_no_main_block() {
        let src = "unit U;\ninterface\nimplementation\nprocedure Q;\nbegin\nend;\nend.";
        assert_eq!(faults(src), vec![]);
    }

    #[test]
    fn variant_record_shares_the_record_end() {
        let src = "program P;\ntype\n  TShape = record\n    case kind: integer of\n      1: (r: real);\n      2: (w, h: real);\n  end;\nbegin\nend.";
        assert_eq!(faults(src), vec![]);
    }

    #[test]
    fn class_bodies_close_with_end() {
        let src = "program P;\ntype\n  TFoo = class(TObject)\n    x: integer;\n  end;\n  EBad = class(Exception);\n  TBar = class;\n  TRef = class of TFoo;\n  TOld = object\n    y: integer;\n  end;\nbegin\nend.";
        assert_eq!(faults(src), vec![]);
    }

    #[test]
    fn try_blocks_close_with_end() {
        let src = "program P;\nbegin\n  try\n    x := 1;\n  finally\n    y := 2;\n  end;\n  try\n    z;\n  except\n    on E: Exception do w;\n  end;\nend.";
        assert_eq!(faults(src), vec![]);
    }

    #[test]
    fn stray_closers() {
        let src = "begin\n  x := (1 + 2));\nend;\nend.";
        assert_eq!(
            faults(src),
            vec![
                Fault::Grouping {
                    at: LineInfo::new(1, 14),
                    grouping: GroupingKind::MismatchedParens,
                },
                Fault::Grouping {
                    at: LineInfo::new(3, 0),
                    grouping: GroupingKind::ExtraEnd,
                },
            ]
        );
    }
}
