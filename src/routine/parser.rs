//! Parser for logic routine scripts.
//!
//! Grammar, one statement per line:
//!
//! ```text
//! stmt    := "out" "[" INT "]" "=" expr
//!          | "log" [STRING] [expr]
//! expr    := xor ( "|" xor )*
//! xor     := and ( "^" and )*
//! and     := unary ( "&" unary )*
//! unary   := "!" unary | primary
//! primary := "in" "[" INT "]" | "out" "[" INT "]"
//!          | "0" | "1" | "true" | "false" | "(" expr ")"
//! ```

use super::ast::{Expr, RoutineProgram, Stmt};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{CosimError, Result};

/// Parse routine source text into a program.
pub fn parse(source: &str) -> Result<RoutineProgram> {
    let mut parser = Parser::new(Lexer::new(source))?;
    parser.parse_program()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn parse_program(&mut self) -> Result<RoutineProgram> {
        let mut stmts = Vec::new();

        while self.current.kind != TokenKind::Eof {
            // Skip empty lines
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
                continue;
            }

            stmts.push(self.parse_stmt()?);

            // Statements are line-delimited
            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => break,
                _ => {
                    return Err(CosimError::parse(
                        self.current.line,
                        format!("unexpected token '{}' after statement", self.current.text),
                    ));
                }
            }
        }

        Ok(RoutineProgram { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let line = self.current.line;
        if self.current.kind != TokenKind::Identifier {
            return Err(CosimError::parse(
                line,
                format!("expected statement, got '{}'", self.current.text),
            ));
        }

        match self.current.text.as_str() {
            "out" => {
                self.advance()?;
                let pin = self.parse_index()?;
                self.expect(TokenKind::Equals)?;
                let expr = self.parse_expr()?;
                Ok(Stmt::Assign { pin, expr })
            }
            "log" => {
                self.advance()?;
                let label = if self.current.kind == TokenKind::String {
                    let text = self.current.text.clone();
                    self.advance()?;
                    Some(text)
                } else {
                    None
                };
                let expr = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                if label.is_none() && expr.is_none() {
                    return Err(CosimError::parse(line, "log requires a label or an expression"));
                }
                Ok(Stmt::Log { label, expr })
            }
            other => Err(CosimError::parse(
                line,
                format!("expected 'out' or 'log', got '{}'", other),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_xor()?;
        while self.current.kind == TokenKind::Pipe {
            self.advance()?;
            let rhs = self.parse_xor()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_xor(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.current.kind == TokenKind::Caret {
            self.advance()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Xor(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.current.kind == TokenKind::Amp {
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.current.kind == TokenKind::Bang {
            self.advance()?;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let line = self.current.line;
        match self.current.kind {
            TokenKind::Identifier => match self.current.text.as_str() {
                "in" => {
                    self.advance()?;
                    Ok(Expr::Input(self.parse_index()?))
                }
                "out" => {
                    self.advance()?;
                    Ok(Expr::Output(self.parse_index()?))
                }
                "true" => {
                    self.advance()?;
                    Ok(Expr::Literal(true))
                }
                "false" => {
                    self.advance()?;
                    Ok(Expr::Literal(false))
                }
                other => Err(CosimError::parse(
                    line,
                    format!("unexpected identifier '{}' in expression", other),
                )),
            },
            TokenKind::Number => {
                let value = match self.current.text.as_str() {
                    "0" => false,
                    "1" => true,
                    other => {
                        return Err(CosimError::parse(
                            line,
                            format!("boolean literal must be 0 or 1, got '{}'", other),
                        ));
                    }
                };
                self.advance()?;
                Ok(Expr::Literal(value))
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            _ => Err(CosimError::parse(
                line,
                format!("expected expression, got '{}'", self.current.text),
            )),
        }
    }

    fn parse_index(&mut self) -> Result<usize> {
        self.expect(TokenKind::OpenBracket)?;
        let tok = self.expect(TokenKind::Number)?;
        let index = tok.text.parse::<usize>().map_err(|_| {
            CosimError::parse(tok.line, format!("invalid pin index '{}'", tok.text))
        })?;
        self.expect(TokenKind::CloseBracket)?;
        Ok(index)
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(CosimError::parse(
                self.current.line,
                format!("expected {:?}, got '{}'", kind, self.current.text),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inverter() {
        let program = parse("out[0] = !in[0]").unwrap();
        assert_eq!(program.stmts.len(), 1);
        assert_eq!(
            program.stmts[0],
            Stmt::Assign {
                pin: 0,
                expr: Expr::Not(Box::new(Expr::Input(0))),
            }
        );
    }

    #[test]
    fn test_precedence_not_and_xor_or() {
        // !a & b | c ^ d parses as ((!a) & b) | (c ^ d)
        let program = parse("out[0] = !in[0] & in[1] | in[2] ^ in[3]").unwrap();
        let Stmt::Assign { expr, .. } = &program.stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            *expr,
            Expr::Or(
                Box::new(Expr::And(
                    Box::new(Expr::Not(Box::new(Expr::Input(0)))),
                    Box::new(Expr::Input(1)),
                )),
                Box::new(Expr::Xor(
                    Box::new(Expr::Input(2)),
                    Box::new(Expr::Input(3)),
                )),
            )
        );
    }

    #[test]
    fn test_parens_override_precedence() {
        let program = parse("out[0] = in[0] & (in[1] | in[2])").unwrap();
        let Stmt::Assign { expr, .. } = &program.stmts[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_multi_line_with_comments() {
        let source = "# half adder\nout[0] = in[0] ^ in[1]\nout[1] = in[0] & in[1]\nlog \"sum\" out[0]\n";
        let program = parse(source).unwrap();
        assert_eq!(program.stmts.len(), 3);
    }

    #[test]
    fn test_literals() {
        let program = parse("out[0] = 1\nout[1] = false").unwrap();
        assert_eq!(
            program.stmts[0],
            Stmt::Assign {
                pin: 0,
                expr: Expr::Literal(true)
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("out[0] = ").unwrap_err(),
            CosimError::ParseError { .. }
        ));
        assert!(matches!(
            parse("in[0] = out[0]").unwrap_err(),
            CosimError::ParseError { .. }
        ));
        assert!(matches!(
            parse("log").unwrap_err(),
            CosimError::ParseError { .. }
        ));
        assert!(matches!(
            parse("out[0] = in[0] in[1]").unwrap_err(),
            CosimError::ParseError { .. }
        ));
    }

    #[test]
    fn test_width_validation() {
        let program = parse("out[0] = in[2]").unwrap();
        assert!(program.check_widths(3, 1, "U1").is_ok());
        let err = program.check_widths(2, 1, "U1").unwrap_err();
        assert!(matches!(err, CosimError::PinOutOfRange { pin, .. } if pin == "in[2]"));

        let program = parse("out[1] = in[0]").unwrap();
        let err = program.check_widths(1, 1, "U1").unwrap_err();
        assert!(matches!(err, CosimError::PinOutOfRange { pin, .. } if pin == "out[1]"));
    }
}
