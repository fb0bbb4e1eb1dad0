use crate::{ast::Node, interpreter::lexer::Token, interpreter::parser::core::Parser};

impl Parser<'_> {
    /// Parses a name into a node, returning `None` if the current token is
    /// not a name.
    pub(super) fn name(&mut self) -> Option<Node> {
        let Token::Name(value) = self.tok() else {
            return None;
        };

        let node = Node::Name { value: value.clone(), pos: self.pos().clone() };
        self.next();
        Some(node)
    }

    /// Parses a literal into a node, returning `None` if the current token
    /// is not a literal.
    pub(super) fn literal(&mut self) -> Option<Node> {
        let Token::Literal((typ, value)) = self.tok() else {
            return None;
        };

        let node = Node::Lit { typ: *typ, value: value.clone(), pos: self.pos().clone() };
        self.next();
        Some(node)
    }

    /// Parses a variable reference expression. This parses the `$Ref`,
    /// `$Left.Right`, and `$Left[Right]` forms, consuming dot and index
    /// tails for as long as they follow.
    pub(super) fn ref_expr(&mut self) -> Option<Node> {
        let pos = self.pos().clone();

        if !self.got(&Token::Ref) {
            return None;
        }

        if !matches!(self.tok(), Token::Name(_)) {
            self.expected(&Token::Name(String::new()));
            return None;
        }

        let mut inner = self.name()?;

        loop {
            let tailpos = self.pos().clone();

            match self.tok() {
                Token::Dot => {
                    self.next();

                    if !matches!(self.tok(), Token::Name(_)) {
                        self.expected(&Token::Name(String::new()));
                        self.next();
                        return None;
                    }

                    inner = Node::DotExpr {
                        left:  Box::new(inner),
                        right: Box::new(self.name()?),
                        pos:   tailpos,
                    };
                }
                Token::Lbrack => {
                    self.next();

                    if matches!(self.tok(), Token::Rbrack) {
                        self.err("expected string, int, or variable");
                        self.next();
                        continue;
                    }

                    let right = match self.tok() {
                        Token::Literal(_) => self.literal(),
                        Token::Ref => self.ref_expr(),
                        _ => {
                            self.unexpected();
                            self.next();
                            None
                        }
                    };

                    self.want(&Token::Rbrack);

                    inner = Node::IndExpr {
                        left:  Box::new(inner),
                        right: Box::new(right?),
                        pos:   tailpos,
                    };
                }
                _ => break,
            }
        }

        Some(Node::Ref { inner: Box::new(inner), pos })
    }

    /// Parses an object literal, `(key: value, ...)`. Keys are names, not
    /// strings.
    pub(super) fn obj(&mut self) -> Option<Node> {
        let pos = self.pos().clone();
        self.want(&Token::Lparen);

        let mut pairs = Vec::new();

        self.list(&Token::Comma, &Token::Rparen, |p| {
            let Some(Node::Name { value: key, .. }) = p.name() else {
                p.expected(&Token::Name(String::new()));
                p.advance(&[Token::Rparen, Token::Semi]);
                return;
            };

            p.want(&Token::Colon);

            if let Some(value) = p.expr() {
                pairs.push((key, value));
            }
        });

        Some(Node::Object { pairs, pos })
    }

    /// Parses an array literal, `[item, ...]`.
    pub(super) fn arr(&mut self) -> Option<Node> {
        let pos = self.pos().clone();
        self.want(&Token::Lbrack);

        let mut items = Vec::new();

        self.list(&Token::Comma, &Token::Rbrack, |p| {
            if let Some(item) = p.operand() {
                items.push(item);
            }
        });

        Some(Node::Array { items, pos })
    }

    /// Parses an operand: a literal, variable reference, object, or array.
    /// Returns `None` without consuming anything when the current token
    /// cannot begin an operand.
    pub(super) fn operand(&mut self) -> Option<Node> {
        match self.tok() {
            Token::Literal(_) => self.literal(),
            Token::Ref => self.ref_expr(),
            Token::Lparen => self.obj(),
            Token::Lbrack => self.arr(),
            _ => None,
        }
    }
}
