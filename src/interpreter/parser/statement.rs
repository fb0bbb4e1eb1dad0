use crate::{
    ast::{Branch, Node},
    interpreter::lexer::{Pos, Token},
    interpreter::parser::core::Parser,
};

impl Parser<'_> {
    /// Parses either a name or an index expression. This is used for the
    /// left-hand side of an assignment, where an indexed value may be
    /// assigned to: `Arr[0] = "val"`, `Obj["k"][0] = v`, or `Arr[] = v` to
    /// append.
    pub(super) fn name_expr(&mut self) -> Option<Node> {
        let mut node = self.name()?;

        while matches!(self.tok(), Token::Lbrack) {
            let pos = self.pos().clone();
            self.next();

            let right = match self.tok() {
                Token::Rbrack => Some(Node::Array { items: Vec::new(), pos: pos.clone() }),
                Token::Literal(_) => self.literal(),
                Token::Ref => self.ref_expr(),
                _ => {
                    self.unexpected();
                    self.next();
                    None
                }
            };

            self.want(&Token::Rbrack);

            node = Node::IndExpr {
                left:  Box::new(node),
                right: Box::new(right?),
                pos,
            };
        }
        Some(node)
    }

    /// Collects the comma-separated rest of an assignment's left-hand side.
    fn name_list(&mut self, first: Node) -> Vec<Node> {
        let mut nodes = vec![first];

        while self.got(&Token::Comma) {
            if let Some(node) = self.name_expr() {
                nodes.push(node);
            }
        }
        nodes
    }

    /// Parses the `= rhs, ...` half of an assignment for the given left-hand
    /// side list.
    fn assign_from(&mut self, left: Vec<Node>, pos: Pos) -> Option<Node> {
        if !self.got(&Token::Assign) {
            return None;
        }

        let mut right = Vec::new();

        if let Some(node) = self.expr() {
            right.push(node);
        }
        while self.got(&Token::Comma) {
            if let Some(node) = self.expr() {
                right.push(node);
            }
        }

        let rpos = right.first().map_or_else(|| pos.clone(), |n| n.pos().clone());

        Some(Node::AssignStmt {
            left:  Box::new(Node::ExprList { nodes: left, pos: pos.clone() }),
            right: Box::new(Node::ExprList { nodes: right, pos: rpos }),
            pos,
        })
    }

    /// Parses an assignment starting from its already-parsed first
    /// left-hand side expression.
    pub(super) fn assign(&mut self, first: Node) -> Option<Node> {
        let pos = first.pos().clone();
        let left = self.name_list(first);
        self.assign_from(left, pos)
    }

    /// Parses the statement after `for`. Besides an assignment or a bare
    /// condition expression this may be a range head, `names range expr`.
    fn init_expr(&mut self) -> Option<Node> {
        let node = match self.tok() {
            Token::Name(_) => {
                let first = self.name_expr()?;
                let pos = first.pos().clone();

                if !matches!(self.tok(), Token::Assign | Token::Comma | Token::Range) {
                    self.unexpected();
                    self.advance(&[Token::Semi]);
                    return None;
                }

                let names = self.name_list(first);

                if matches!(self.tok(), Token::Range) {
                    let rangepos = self.pos().clone();
                    self.next();

                    let right = self.expr()?;

                    return Some(Node::Range {
                        left:  Box::new(Node::ExprList { nodes: names, pos }),
                        right: Box::new(right),
                        pos:   rangepos,
                    });
                }
                return self.assign_from(names, pos);
            }
            Token::Literal(_) => self.literal(),
            Token::Ref => self.ref_expr(),
            _ => {
                self.unexpected();
                self.advance(&[Token::Semi]);
                return None;
            }
        };

        if matches!(self.tok(), Token::Op(_)) {
            return self.binary_expr(node, 0);
        }
        node
    }

    /// Parses a simple statement, as used for the post part of a three-part
    /// `for` loop.
    fn simple_stmt(&mut self) -> Option<Node> {
        match self.tok() {
            Token::Name(_) => {
                let name = self.name_expr()?;

                if !matches!(self.tok(), Token::Assign | Token::Comma) {
                    self.unexpected();
                    self.advance(&[Token::Semi]);
                    return None;
                }
                self.assign(name)
            }
            Token::Literal(_) => self.literal(),
            Token::Ref => self.ref_expr(),
            _ => {
                self.unexpected();
                self.advance(&[Token::Semi]);
                None
            }
        }
    }

    /// Parses a `{ ... }` block of statements.
    pub(super) fn block_stmt(&mut self) -> Option<Node> {
        let pos = self.pos().clone();
        self.want(&Token::Lbrace);

        let mut nodes = Vec::new();

        self.skip_semis();

        while !matches!(self.tok(), Token::Rbrace | Token::Eof) {
            if let Some(node) = self.stmt(false) {
                nodes.push(node);
            }
            self.skip_semis();
        }

        self.want(&Token::Rbrace);
        Some(Node::BlockStmt { nodes, pos })
    }

    /// Parses a single `literal -> stmt-or-block` arm of a match statement.
    fn case_stmt(&mut self) -> Option<Node> {
        let pos = self.pos().clone();

        let Some(value) = self.literal() else {
            self.unexpected();
            self.next();
            return None;
        };

        self.want(&Token::Arrow);

        let then = match self.tok() {
            Token::Lbrace => self.block_stmt(),
            Token::Name(_) => {
                let name = self.name()?;
                Some(self.command(name))
            }
            _ => {
                self.unexpected();
                self.next();
                None
            }
        };

        Some(Node::CaseStmt { value: Box::new(value), then: Box::new(then?), pos })
    }

    /// Parses a match statement. The condition is a literal or reference;
    /// cases map literals to statements or blocks, and a bare `_` arm is the
    /// default case.
    fn match_stmt(&mut self) -> Option<Node> {
        let pos = self.pos().clone();

        if !self.got(&Token::Match) {
            return None;
        }

        let cond = match self.tok() {
            Token::Literal(_) => self.literal(),
            Token::Ref => self.ref_expr(),
            _ => {
                self.unexpected();
                self.next();
                None
            }
        };

        self.want(&Token::Lbrace);

        let mut cases = Vec::new();
        let mut default = None;

        self.skip_semis();

        while !matches!(self.tok(), Token::Rbrace | Token::Eof) {
            if let Token::Name(name) = self.tok() {
                if name != "_" {
                    self.expected(&Token::Name(String::new()));
                    self.advance(&[Token::Rbrace, Token::Semi]);
                    self.skip_semis();
                    continue;
                }

                self.next();
                self.want(&Token::Arrow);

                default = match self.tok() {
                    Token::Lbrace => self.block_stmt(),
                    Token::Name(_) => {
                        let name = self.name()?;
                        Some(self.command(name))
                    }
                    _ => {
                        self.unexpected();
                        self.next();
                        None
                    }
                };

                self.skip_semis();
                continue;
            }

            if let Some(case) = self.case_stmt() {
                cases.push(case);
            }
            self.skip_semis();
        }

        self.got(&Token::Rbrace);

        Some(Node::MatchStmt {
            cond: Box::new(cond?),
            cases,
            default: default.map(Box::new),
            pos,
        })
    }

    /// Parses an if statement with its optional `else if` and `else`
    /// branches.
    fn if_stmt(&mut self) -> Option<Node> {
        let pos = self.pos().clone();

        if !self.got(&Token::If) {
            return None;
        }

        let cond = self.expr();

        if !matches!(self.tok(), Token::Lbrace) {
            self.err_at(crate::error::ParseError::Message {
                msg: "missing condition in if statement".to_string(),
                pos: pos.clone(),
            });
            return None;
        }

        let then = self.block_stmt()?;

        let mut els = None;

        if self.got(&Token::Else) {
            els = match self.tok() {
                Token::If => self.if_stmt(),
                Token::Lbrace => self.block_stmt(),
                _ => {
                    self.err("expected if statement or {");
                    self.next();
                    None
                }
            };
        }

        Some(Node::IfStmt {
            cond: Box::new(cond?),
            then: Box::new(then),
            els: els.map(Box::new),
            pos,
        })
    }

    /// Parses a for statement in any of its forms: `for { }`, `for expr { }`,
    /// `for init; cond; post { }`, and `for names range expr { }`.
    fn for_stmt(&mut self) -> Option<Node> {
        let pos = self.pos().clone();

        if !self.got(&Token::For) {
            return None;
        }

        let mut init = None;
        let mut cond = None;
        let mut post = None;

        if !matches!(self.tok(), Token::Lbrace) {
            init = self.init_expr();

            if !self.got(&Token::Semi) {
                if !matches!(self.tok(), Token::Lbrace) {
                    self.err("expected for loop condition");
                    return None;
                }

                // A single expression before the block is the loop
                // condition, unless it is a range head.
                if !matches!(init.as_ref(), Some(Node::Range { .. })) {
                    cond = init.take();
                }
            } else {
                cond = self.expr();
                self.want(&Token::Semi);
                post = self.simple_stmt();
            }
        }

        let body = self.block_stmt()?;

        Some(Node::ForStmt {
            init: init.map(Box::new),
            cond: cond.map(Box::new),
            post: post.map(Box::new),
            body: Box::new(body),
            pos,
        })
    }

    /// Parses a top-level statement. In REPL mode bare reference expressions
    /// are allowed and the terminator is optional, so the contents of a
    /// variable can be displayed by referring to it.
    pub(super) fn stmt(&mut self, in_repl: bool) -> Option<Node> {
        let node = match self.tok() {
            Token::Name(_) => {
                let expr = self.name_expr();

                match expr {
                    Some(expr) if matches!(self.tok(), Token::Assign | Token::Comma) => {
                        self.assign(expr)
                    }
                    Some(Node::IndExpr { pos, .. }) => {
                        self.err_at(crate::error::ParseError::Message {
                            msg: "unassigned index expression".to_string(),
                            pos,
                        });
                        self.advance(&[Token::Semi]);
                        None
                    }
                    Some(name @ Node::Name { .. }) => {
                        let cmd = self.command(name);

                        if self.got(&Token::Arrow) {
                            Some(self.chain(cmd))
                        } else {
                            Some(cmd)
                        }
                    }
                    _ => None,
                }
            }
            Token::Break => {
                let node = Node::BranchStmt { kind: Branch::Break, pos: self.pos().clone() };
                self.next();
                Some(node)
            }
            Token::Continue => {
                let node = Node::BranchStmt { kind: Branch::Continue, pos: self.pos().clone() };
                self.next();
                Some(node)
            }
            Token::Match => return self.match_stmt(),
            Token::If => return self.if_stmt(),
            Token::For => return self.for_stmt(),
            Token::Ref if in_repl => self.ref_expr(),
            _ => {
                self.unexpected();
                self.advance(&[Token::Semi]);
                None
            }
        };

        if !self.got(&Token::Semi) && !in_repl {
            self.expected(&Token::Semi);
        }
        node
    }
}
