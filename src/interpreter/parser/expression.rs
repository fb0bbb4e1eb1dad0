use crate::{ast::Node, interpreter::lexer::Token, interpreter::parser::core::Parser};

impl Parser<'_> {
    /// Parses an expression.
    pub(super) fn expr(&mut self) -> Option<Node> {
        self.binary_expr(None, 0)
    }

    /// Parses a binary expression with precedence climbing. First this
    /// parses a unary expression, then keeps folding operators that bind
    /// tighter than the given precedence.
    pub(super) fn binary_expr(&mut self, n: Option<Node>, prec: u8) -> Option<Node> {
        let mut n = match n {
            Some(n) => Some(n),
            None => self.unary_expr(),
        };

        while let Token::Op(op) = self.tok() {
            let op = *op;

            if op.prec() <= prec {
                break;
            }

            let pos = self.pos().clone();
            self.next();

            let right = self.binary_expr(None, op.prec());

            n = Some(Node::Operation {
                op,
                left: Box::new(n?),
                right: right.map(Box::new),
                pos,
            });
        }
        n
    }

    /// Parses a unary expression, an expression with only a single operand.
    /// A name here starts a command invocation, possibly chained.
    pub(super) fn unary_expr(&mut self) -> Option<Node> {
        if matches!(self.tok(), Token::Name(_)) {
            let name = self.name()?;
            let cmd = self.command(name);

            if self.got(&Token::Arrow) {
                return Some(self.chain(cmd));
            }
            return Some(cmd);
        }
        self.operand()
    }

    /// Parses a command invocation. Arguments are operands or bare names,
    /// consumed until a token that cannot continue the argument list.
    pub(super) fn command(&mut self, name: Node) -> Node {
        let Node::Name { value: name, pos } = name else {
            unreachable!("command names are parsed as name nodes");
        };

        let mut args = Vec::new();

        while !matches!(self.tok(), Token::Arrow | Token::Semi | Token::Eof) {
            if matches!(self.tok(), Token::Name(_)) {
                if let Some(arg) = self.name() {
                    args.push(arg);
                }
                continue;
            }

            match self.operand() {
                Some(arg) => args.push(arg),
                None => break,
            }
        }

        Node::CommandStmt { name, args, pos }
    }

    /// Parses the remaining commands of a chain, `a -> b -> c`, after the
    /// arrow following the first command has been consumed.
    pub(super) fn chain(&mut self, first: Node) -> Node {
        let pos = first.pos().clone();
        let mut commands = vec![first];

        while !matches!(self.tok(), Token::Semi | Token::Eof) {
            let Some(name) = self.name() else {
                self.expected(&Token::Name(String::new()));
                self.advance(&[Token::Semi]);
                continue;
            };

            commands.push(self.command(name));

            if !self.got(&Token::Arrow) && !matches!(self.tok(), Token::Semi | Token::Eof) {
                break;
            }
        }

        Node::ChainExpr { commands, pos }
    }
}
