use std::mem;

use crate::{
    ast::Node,
    error::ParseError,
    interpreter::lexer::{self, Pos, Token},
};

/// A recursive-descent parser over a scanned token list.
///
/// The parser is recoverable: when it finds an unexpected token it reports
/// through the error sink, advances to a follow set, and keeps parsing, so a
/// single pass surfaces as many problems as possible. The error count decides
/// whether the parse as a whole succeeded.
pub struct Parser<'a> {
    pub(super) tokens: Vec<(Token, Pos)>,
    pub(super) idx:    usize,
    pub(super) errc:   usize,
    pub(super) errh:   &'a mut dyn FnMut(&ParseError),
}

/// Parses the given source into a list of AST nodes. Every error found
/// during scanning and parsing is handed to the given sink; if any occurred,
/// the returned error summarizes how many. The given name identifies the
/// source in positions, typically a file name.
pub fn parse(
    name: &str,
    source: &str,
    errh: &mut dyn FnMut(&ParseError),
) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser::new(name, source, errh);
    let nodes = parser.parse_all(false);

    if parser.errc > 0 {
        return Err(ParseError::Count { count: parser.errc });
    }
    Ok(nodes)
}

/// Parses all of the expressions from the given string leniently: bare
/// references are allowed and a trailing terminator is optional. This is
/// used by the REPL to parse each line that is input. If multiple errors
/// occur, the first is returned.
pub fn parse_expr(line: &str) -> Result<Vec<Node>, ParseError> {
    let mut errs = Vec::new();

    let mut sink = |err: &ParseError| errs.push(err.clone());
    let mut parser = Parser::new("", line, &mut sink);
    let nodes = parser.parse_all(true);

    match errs.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(nodes),
    }
}

/// Parses a single `$Ref`, `$Ref.Dot`, or `$Ref[Ind]` expression. String
/// interpolation reuses this so references inside strings share one grammar.
/// If multiple errors occur, the first is returned.
pub fn parse_ref(s: &str) -> Result<Node, ParseError> {
    let mut errs = Vec::new();

    let mut sink = |err: &ParseError| errs.push(err.clone());
    let mut parser = Parser::new("", s, &mut sink);

    if !matches!(parser.tok(), Token::Ref) {
        return Err(ParseError::Message {
            msg: "expected $".to_string(),
            pos: parser.pos().clone(),
        });
    }

    let node = parser.ref_expr();

    if let Some(err) = errs.into_iter().next() {
        return Err(err);
    }

    node.ok_or(ParseError::Message { msg: "invalid reference".to_string(), pos: Pos::default() })
}

impl<'a> Parser<'a> {
    pub fn new(name: &str, source: &str, errh: &'a mut dyn FnMut(&ParseError)) -> Self {
        let mut scan_errs = Vec::new();
        let tokens = lexer::lex(name, source, &mut |pos, msg| {
            scan_errs.push(ParseError::Message { msg: msg.to_string(), pos });
        });

        let errc = scan_errs.len();

        for err in &scan_errs {
            errh(err);
        }

        Self { tokens, idx: 0, errc, errh }
    }

    /// The current token.
    pub(super) fn tok(&self) -> &Token {
        &self.tokens[self.idx].0
    }

    /// The position of the current token.
    pub(super) fn pos(&self) -> &Pos {
        &self.tokens[self.idx].1
    }

    pub(super) fn next(&mut self) {
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
    }

    /// Consumes the given token if it matches what we currently have, and
    /// reports whether it was consumed.
    pub(super) fn got(&mut self, tok: &Token) -> bool {
        if self.tok() == tok {
            self.next();
            return true;
        }
        false
    }

    /// Attempts to consume the given token, reporting an error if it cannot
    /// be.
    pub(super) fn want(&mut self, tok: &Token) {
        if !self.got(tok) {
            self.expected(tok);
        }
    }

    /// Consumes tokens while the current token has no use, typically blank
    /// lines between statements.
    pub(super) fn skip_semis(&mut self) {
        while matches!(self.tok(), Token::Semi) {
            self.next();
        }
    }

    /// Moves the parser along the given follow set of tokens and stops at
    /// the first one it encounters. This always stops at end of input if
    /// none of the tokens can be found.
    pub(super) fn advance(&mut self, follow: &[Token]) {
        loop {
            let tok = self.tok();

            if matches!(tok, Token::Eof) {
                return;
            }
            if follow.iter().any(|f| mem::discriminant(f) == mem::discriminant(tok)) {
                return;
            }
            self.next();
        }
    }

    /// Reports an error at the given position.
    pub(super) fn err_at(&mut self, err: ParseError) {
        self.errc += 1;
        (self.errh)(&err);
    }

    /// Reports a free-form error at the current position.
    pub(super) fn err(&mut self, msg: &str) {
        let pos = self.pos().clone();
        self.err_at(ParseError::Message { msg: msg.to_string(), pos });
    }

    pub(super) fn expected(&mut self, tok: &Token) {
        let pos = self.pos().clone();
        self.err_at(ParseError::Expected { token: tok.to_string(), pos });
    }

    pub(super) fn unexpected(&mut self) {
        let (pos, token) = (self.pos().clone(), self.tok().to_string());
        self.err_at(ParseError::Unexpected { token, pos });
    }

    /// Parses every statement up to end of input.
    pub(super) fn parse_all(&mut self, in_repl: bool) -> Vec<Node> {
        let mut nodes = Vec::new();

        self.skip_semis();

        while !matches!(self.tok(), Token::Eof) {
            if let Some(node) = self.stmt(in_repl) {
                nodes.push(node);
            }
            self.skip_semis();
        }
        nodes
    }

    /// Parses all of the tokens in a list with the given separator and end
    /// token. The given callback handles the parsing of each element.
    /// Newlines between elements are skipped, so lists can span lines.
    pub(super) fn list(&mut self, sep: &Token, end: &Token, mut parse: impl FnMut(&mut Self)) {
        self.skip_semis();

        while !matches!(self.tok(), Token::Eof) && self.tok() != end {
            parse(self);
            self.skip_semis();

            if !self.got(sep) && self.tok() != end {
                self.err(&format!("expected {sep} or {end}"));
                self.next();
            }
            self.skip_semis();
        }
        self.want(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Branch;
    use crate::interpreter::lexer::{LitType, Op};

    fn parse_one(source: &str) -> Node {
        let mut nodes = parse("", source, &mut |_| {}).expect("parse should succeed");

        assert_eq!(nodes.len(), 1, "expected a single statement");
        nodes.remove(0)
    }

    #[test]
    fn parses_assignment_with_command_rhs() {
        let node = parse_one("Token = env \"GH_TOKEN\";");

        let Node::AssignStmt { left, right, .. } = node else {
            panic!("expected assignment, got {node:?}");
        };

        let Node::ExprList { nodes, .. } = *left else { panic!("expected lhs list") };
        assert!(matches!(&nodes[0], Node::Name { value, .. } if value == "Token"));

        let Node::ExprList { nodes, .. } = *right else { panic!("expected rhs list") };
        let Node::CommandStmt { name, args, .. } = &nodes[0] else {
            panic!("expected command on rhs");
        };
        assert_eq!(name, "env");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn parses_multi_assignment_lists() {
        let node = parse_one("A, B = 1, 2;");

        let Node::AssignStmt { left, right, .. } = node else { panic!("expected assignment") };
        let Node::ExprList { nodes: lhs, .. } = *left else { panic!() };
        let Node::ExprList { nodes: rhs, .. } = *right else { panic!() };

        assert_eq!(lhs.len(), 2);
        assert_eq!(rhs.len(), 2);
    }

    #[test]
    fn parses_chained_commands() {
        let node = parse_one("GET \"https://example.com\" -> send;");

        let Node::ChainExpr { commands, .. } = node else { panic!("expected chain") };

        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], Node::CommandStmt { name, .. } if name == "GET"));
        assert!(matches!(&commands[1], Node::CommandStmt { name, .. } if name == "send"));
    }

    #[test]
    fn parses_reference_tails() {
        let node = parse_one("writeln _ $Resp.Header[\"Content-Type\"];");

        let Node::CommandStmt { args, .. } = node else { panic!("expected command") };
        let Node::Ref { inner, .. } = &args[1] else { panic!("expected reference") };
        let Node::IndExpr { left, .. } = inner.as_ref() else { panic!("expected index tail") };

        assert!(matches!(left.as_ref(), Node::DotExpr { .. }));
    }

    #[test]
    fn parses_object_literals_across_lines() {
        let node = parse_one("Req = GET \"url\" (\n    Accept: \"text/plain\",\n    A: 1,\n);");

        let Node::AssignStmt { right, .. } = node else { panic!("expected assignment") };
        let Node::ExprList { nodes, .. } = *right else { panic!() };
        let Node::CommandStmt { args, .. } = &nodes[0] else { panic!("expected command") };
        let Node::Object { pairs, .. } = &args[1] else { panic!("expected object arg") };

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "Accept");
        assert_eq!(pairs[1].0, "A");
    }

    #[test]
    fn parses_match_with_default() {
        let node = parse_one("match $X {\n    \"a\" -> writeln _ \"A\";\n    _ -> writeln _ \"other\";\n}");

        let Node::MatchStmt { cases, default, .. } = node else { panic!("expected match") };

        assert_eq!(cases.len(), 1);
        assert!(default.is_some());
    }

    #[test]
    fn parses_the_three_for_forms_and_range() {
        assert!(matches!(
            parse_one("for { break; }"),
            Node::ForStmt { init: None, cond: None, post: None, .. }
        ));

        assert!(matches!(
            parse_one("for $N > 0 { continue; }"),
            Node::ForStmt { init: None, cond: Some(_), post: None, .. }
        ));

        let node = parse_one("for i = 0; $i < 3; i = $Next { writeln _ \"x\"; }");
        assert!(matches!(
            node,
            Node::ForStmt { init: Some(_), cond: Some(_), post: Some(_), .. }
        ));

        let node = parse_one("for K, V range $O { writeln _ $K; }");
        let Node::ForStmt { init: Some(init), .. } = node else { panic!("expected for") };
        let Node::Range { left, .. } = *init else { panic!("expected range init") };
        let Node::ExprList { nodes, .. } = *left else { panic!() };
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn parses_index_assignment_and_append() {
        let node = parse_one("Arr[0] = \"val\";");
        let Node::AssignStmt { left, .. } = node else { panic!("expected assignment") };
        let Node::ExprList { nodes, .. } = *left else { panic!() };
        assert!(matches!(&nodes[0], Node::IndExpr { .. }));

        let node = parse_one("Arr[] = \"val\";");
        let Node::AssignStmt { left, .. } = node else { panic!("expected assignment") };
        let Node::ExprList { nodes, .. } = *left else { panic!() };
        let Node::IndExpr { right, .. } = &nodes[0] else { panic!("expected index") };
        assert!(matches!(right.as_ref(), Node::Array { items, .. } if items.is_empty()));
    }

    #[test]
    fn parses_operator_precedence() {
        let node = parse_one("if $A == 1 and $B == 2 or $C == 3 { }");

        let Node::IfStmt { cond, .. } = node else { panic!("expected if") };

        // or binds loosest: (A == 1 and B == 2) or (C == 3)
        let Node::Operation { op: Op::Or, left, .. } = *cond else {
            panic!("expected or at the root");
        };
        assert!(matches!(*left, Node::Operation { op: Op::And, .. }));
    }

    #[test]
    fn parses_branch_statements() {
        assert!(matches!(
            parse_one("for { break; }"),
            Node::ForStmt { .. }
        ));

        let node = parse_one("for { continue; }");
        let Node::ForStmt { body, .. } = node else { panic!() };
        let Node::BlockStmt { nodes, .. } = *body else { panic!() };
        assert!(matches!(&nodes[0], Node::BranchStmt { kind: Branch::Continue, .. }));
    }

    #[test]
    fn repl_mode_allows_bare_references() {
        let nodes = parse_expr("$Resp.StatusCode").unwrap();
        assert!(matches!(&nodes[0], Node::Ref { .. }));

        // Outside the REPL a bare reference is not a statement.
        assert!(parse("", "$Resp;", &mut |_| {}).is_err());
    }

    #[test]
    fn parse_ref_handles_dot_and_index_chains() {
        let node = parse_ref("$User[\"login\"]").unwrap();
        let Node::Ref { inner, .. } = node else { panic!("expected ref") };
        assert!(matches!(inner.as_ref(), Node::IndExpr { .. }));

        assert!(parse_ref("User").is_err());
    }

    #[test]
    fn errors_accumulate_and_are_counted() {
        let mut seen = Vec::new();
        let err = parse("", "= 1;\n? 2;\nX = 3;", &mut |e| seen.push(e.to_string())).unwrap_err();

        let ParseError::Count { count } = err else { panic!("expected count") };
        assert_eq!(count, seen.len());
        assert!(count >= 2);
    }

    #[test]
    fn literal_types_are_tagged() {
        let nodes = parse("", "A = 1; B = 2.5; C = true; D = \"s\";", &mut |_| {}).unwrap();

        let types: Vec<LitType> = nodes
            .iter()
            .map(|n| {
                let Node::AssignStmt { right, .. } = n else { panic!() };
                let Node::ExprList { nodes, .. } = right.as_ref() else { panic!() };
                let Node::Lit { typ, .. } = &nodes[0] else { panic!() };
                *typ
            })
            .collect();

        assert_eq!(types, vec![LitType::Int, LitType::Float, LitType::Bool, LitType::String]);
    }
}
