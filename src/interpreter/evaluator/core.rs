use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    ast::{Branch, Node},
    error::RuntimeError,
    interpreter::{
        evaluator::command,
        lexer::{LitType, Pos},
        value::{
            array::Array,
            core::{self, Value, compare_type},
            object::Object,
            stream::FileStream,
        },
    },
};

/// Result type used by the evaluator. Constructs that produce no value, such
/// as assignments and blocks, evaluate to `None`.
pub type EvalResult = Result<Option<Value>, RuntimeError>;

/// Stores the variables that have been set during a script's evaluation.
///
/// Storage is a single flat table. Each block pushes a delta log of the
/// names it introduces, and those names are pruned when the block exits, so
/// re-assignment to an outer name is visible after the block while names
/// introduced inside it are not.
#[derive(Default)]
pub struct Context {
    symtab: FxHashMap<String, Value>,
    scopes: Vec<FxHashSet<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the given value to the given name in the current scope.
    pub fn put(&mut self, name: &str, val: Value) {
        if !self.symtab.contains_key(name)
            && let Some(scope) = self.scopes.last_mut()
        {
            scope.insert(name.to_string());
        }
        self.symtab.insert(name.to_string(), val);
    }

    /// Returns the value bound to the given name. If no value is bound, then
    /// this errors.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        match self.symtab.get(name) {
            Some(val) => Ok(val.clone()),
            None => Err(RuntimeError::Undefined { name: name.to_string() }),
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    /// Prunes every name the closing scope introduced.
    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for name in scope {
                self.symtab.remove(&name);
            }
        }
    }
}

/// Evaluates parsed scripts.
///
/// The evaluator holds the output stream the write commands target, and the
/// list of files opened during evaluation. Those files are closed on normal
/// termination; the `exit` command terminates the process directly and so
/// skips them.
pub struct Evaluator<'a> {
    pub(super) out: &'a mut dyn Write,

    finalizers: Vec<Rc<RefCell<FileStream>>>,
}

impl<'a> Evaluator<'a> {
    /// Returns a new evaluator. The given writer is used as the standard
    /// output destination for the write and writeln commands.
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out, finalizers: Vec::new() }
    }

    /// Evaluates all of the given nodes in a fresh context, then closes the
    /// files that were opened along the way.
    pub fn run(&mut self, nodes: &[Node]) -> Result<(), RuntimeError> {
        let mut ctx = Context::new();

        for node in nodes {
            self.eval(&mut ctx, node)?;
        }

        for file in self.finalizers.drain(..) {
            file.borrow_mut().close();
        }
        Ok(())
    }

    /// Evaluates the given node and returns the value it evaluates to, if
    /// any.
    pub fn eval(&mut self, c: &mut Context, n: &Node) -> EvalResult {
        match n {
            Node::AssignStmt { left, right, pos } => {
                let (Node::ExprList { nodes: left, .. }, Node::ExprList { nodes: right, .. }) =
                    (left.as_ref(), right.as_ref())
                else {
                    return Err(RuntimeError::Message(
                        "assignment is not to a list of variables".to_string(),
                    )
                    .at(pos));
                };

                if left.len() != right.len() {
                    return Err(RuntimeError::Mismatch {
                        vars: left.len(),
                        vals: right.len(),
                    }
                    .at(pos));
                }

                for (target, expr) in left.iter().zip(right) {
                    let val = self
                        .eval(c, expr)?
                        .ok_or(RuntimeError::MissingValue)
                        .map_err(|err| err.at(expr.pos()))?;

                    self.eval_assign(c, true, target, val).map_err(|err| err.at(pos))?;
                }
                Ok(None)
            }
            Node::Ref { inner, .. } => match inner.as_ref() {
                Node::Name { value, pos } => {
                    Ok(Some(c.get(value).map_err(|err| err.at(pos))?))
                }
                node @ Node::DotExpr { pos, .. } => {
                    Ok(Some(self.resolve_dot(c, node).map_err(|err| err.at(pos))?))
                }
                node @ Node::IndExpr { pos, .. } => {
                    Ok(Some(self.resolve_index(c, node).map_err(|err| err.at(pos))?))
                }
                node => Err(RuntimeError::Message("invalid reference".to_string()).at(node.pos())),
            },
            node @ Node::DotExpr { pos, .. } => {
                Ok(Some(self.resolve_dot(c, node).map_err(|err| err.at(pos))?))
            }
            node @ Node::IndExpr { pos, .. } => {
                Ok(Some(self.resolve_index(c, node).map_err(|err| err.at(pos))?))
            }
            Node::Lit { typ, value, pos } => match typ {
                LitType::String => Ok(Some(self.interpolate(c, pos, value)?)),
                LitType::Int => Ok(Some(Value::Int(value.parse().unwrap_or(0)))),
                LitType::Float => {
                    Ok(Some(Value::Float(value.parse().unwrap_or(0.0).into())))
                }
                LitType::Bool => Ok(Some(Value::Bool(value == "true"))),
            },
            Node::Name { value, .. } => Ok(Some(Value::Name(value.clone()))),
            Node::Array { items, pos } => {
                let mut vals = Vec::with_capacity(items.len());

                for item in items {
                    let val = self
                        .eval(c, item)?
                        .ok_or(RuntimeError::MissingValue)
                        .map_err(|err| err.at(item.pos()))?;
                    vals.push(val);
                }

                let arr = Array::new(vals).map_err(|err| err.at(pos))?;
                Ok(Some(Value::Array(Rc::new(RefCell::new(arr)))))
            }
            Node::Object { pairs, .. } => {
                let mut vals = Vec::with_capacity(pairs.len());

                for (key, node) in pairs {
                    let val = self
                        .eval(c, node)?
                        .ok_or(RuntimeError::MissingValue)
                        .map_err(|err| err.at(node.pos()))?;
                    vals.push((key.clone(), val));
                }
                Ok(Some(Value::Object(Rc::new(RefCell::new(Object::from_pairs(vals))))))
            }
            Node::BlockStmt { nodes, .. } => {
                c.begin_scope();

                let mut result = Ok(None);

                for node in nodes {
                    if let Err(err) = self.eval(c, node) {
                        result = Err(err);
                        break;
                    }
                }

                c.end_scope();
                result
            }
            Node::CommandStmt { name, args, pos } => {
                let Some(cmd) = command::lookup(name) else {
                    return Err(
                        RuntimeError::UndefinedCommand { name: name.clone() }.at(pos)
                    );
                };

                let args = self.eval_args(c, args)?;
                let val = cmd.invoke(self.out, args).map_err(|err| err.at(pos))?;

                if let Some(Value::File(file)) = &val {
                    self.finalizers.push(Rc::clone(file));
                }
                Ok(val)
            }
            Node::ChainExpr { commands, .. } => {
                let mut piped: Option<Value> = None;

                for node in commands {
                    let Node::CommandStmt { name, args, pos } = node else {
                        continue;
                    };

                    let Some(cmd) = command::lookup(name) else {
                        return Err(
                            RuntimeError::UndefinedCommand { name: name.clone() }.at(pos)
                        );
                    };

                    let mut args = self.eval_args(c, args)?;

                    // The previous command's return value becomes the last
                    // argument of the next command.
                    if let Some(val) = piped.take() {
                        args.push(val);
                    }

                    piped = cmd.invoke(self.out, args).map_err(|err| err.at(pos))?;

                    if let Some(Value::File(file)) = &piped {
                        self.finalizers.push(Rc::clone(file));
                    }
                }
                Ok(piped)
            }
            Node::MatchStmt { cond, cases, default, .. } => {
                let condval = self
                    .eval(c, cond)?
                    .ok_or(RuntimeError::MissingValue)
                    .map_err(|err| err.at(cond.pos()))?;

                let mut jmptab: FxHashMap<String, &Node> = FxHashMap::default();

                for case in cases {
                    let Node::CaseStmt { value, then, pos } = case else {
                        continue;
                    };

                    let caseval = self
                        .eval(c, value)?
                        .ok_or(RuntimeError::MissingValue)
                        .map_err(|err| err.at(value.pos()))?;

                    compare_type(&condval, &caseval).map_err(|err| err.at(pos))?;

                    jmptab.insert(caseval.to_string(), then.as_ref());
                }

                if let Some(&then) = jmptab.get(&condval.to_string()) {
                    return self.eval(c, then);
                }
                if let Some(default) = default {
                    return self.eval(c, default);
                }
                Ok(None)
            }
            Node::IfStmt { cond, then, els, .. } => {
                let val = self.eval(c, cond)?;

                if val.is_some_and(|v| v.truthy()) {
                    return self.eval(c, then);
                }
                if let Some(els) = els {
                    return self.eval(c, els);
                }
                Ok(None)
            }
            Node::Operation { op, left, right, pos } => {
                let lval = self
                    .eval(c, left)?
                    .ok_or(RuntimeError::MissingValue)
                    .map_err(|err| err.at(left.pos()))?;

                let Some(right) = right else {
                    return Ok(Some(Value::Bool(lval.truthy())));
                };

                let rval = self
                    .eval(c, right)?
                    .ok_or(RuntimeError::MissingValue)
                    .map_err(|err| err.at(right.pos()))?;

                let val = core::compare(&lval, *op, &rval).map_err(|err| err.at(pos))?;
                Ok(Some(val))
            }
            Node::ForStmt { init, cond, post, body, pos } => {
                c.begin_scope();
                let result = self.eval_for(c, init, cond, post, body, pos);
                c.end_scope();
                result
            }
            Node::BranchStmt { kind, pos } => {
                Err(RuntimeError::Branch { kind: *kind, pos: pos.clone() })
            }
            _ => Ok(None),
        }
    }

    /// Evaluates command arguments left to right.
    fn eval_args(&mut self, c: &mut Context, args: &[Node]) -> Result<Vec<Value>, RuntimeError> {
        let mut vals = Vec::with_capacity(args.len());

        for arg in args {
            let val = self
                .eval(c, arg)?
                .ok_or(RuntimeError::MissingValue)
                .map_err(|err| err.at(arg.pos()))?;
            vals.push(val);
        }
        Ok(vals)
    }

    /// Runs a for loop. The scope enclosing the loop has already been
    /// opened by the caller.
    fn eval_for(
        &mut self,
        c: &mut Context,
        init: &Option<Box<Node>>,
        cond: &Option<Box<Node>>,
        post: &Option<Box<Node>>,
        body: &Node,
        pos: &Pos,
    ) -> EvalResult {
        if let Some(init) = init {
            if let Node::Range { left, right, .. } = init.as_ref() {
                return self.eval_range(c, init.pos(), left, right, body);
            }
            self.eval(c, init).map_err(|err| err.at(pos))?;
        }

        loop {
            if let Some(cond) = cond {
                let val = self.eval(c, cond).map_err(|err| err.at(pos))?;

                if !val.is_some_and(|v| v.truthy()) {
                    break;
                }
            }

            match self.eval(c, body) {
                Ok(_) => {}
                Err(RuntimeError::Branch { kind, .. }) => match kind {
                    Branch::Break => break,
                    Branch::Continue => {}
                },
                Err(err) => return Err(err.at(body.pos())),
            }

            if let Some(post) = post {
                self.eval(c, post).map_err(|err| err.at(pos))?;
            }
        }
        Ok(None)
    }

    /// Iterates the value on the right of `range`, binding each key and
    /// value pair to the names on the left with non-strict assignment.
    fn eval_range(
        &mut self,
        c: &mut Context,
        pos: &Pos,
        left: &Node,
        right: &Node,
        body: &Node,
    ) -> EvalResult {
        let val = self
            .eval(c, right)?
            .ok_or(RuntimeError::MissingValue)
            .map_err(|err| err.at(right.pos()))?;

        let iter = core::to_iterable(&val).map_err(|err| err.at(right.pos()))?;

        let Node::ExprList { nodes, .. } = left else {
            return Err(RuntimeError::Message(
                "assignment is not to a list of variables".to_string(),
            )
            .at(pos));
        };

        if nodes.len() > 2 {
            return Err(RuntimeError::RangeMismatch.at(pos));
        }

        while let Some((key, val)) = iter.next() {
            if let Some(target) = nodes.first() {
                self.eval_assign(c, false, target, key).map_err(|err| err.at(pos))?;
            }
            if let Some(target) = nodes.get(1) {
                self.eval_assign(c, false, target, val)
                    .map_err(|err| err.at(target.pos()))?;
            }

            match self.eval(c, body) {
                Ok(_) => {}
                Err(RuntimeError::Branch { kind, .. }) => match kind {
                    Branch::Break => break,
                    Branch::Continue => {}
                },
                Err(err) => return Err(err.at(body.pos())),
            }
        }
        Ok(None)
    }

    /// Evaluates the target node and assigns the given value to it. A name
    /// binds directly in the symbol table, with `_` discarding the value; an
    /// index expression resolves the value being indexed and stores through
    /// it. In strict mode the incoming value's type must match what it
    /// replaces.
    pub(super) fn eval_assign(
        &mut self,
        c: &mut Context,
        strict: bool,
        n: &Node,
        val: Value,
    ) -> Result<(), RuntimeError> {
        match n {
            Node::Name { value: name, .. } => {
                if name == "_" {
                    return Ok(());
                }

                if strict && let Ok(orig) = c.get(name) {
                    compare_type(&val, &orig)?;
                }

                c.put(name, val);
                Ok(())
            }
            Node::IndExpr { left, right, .. } => {
                let mut target = self
                    .eval(c, left)?
                    .ok_or(RuntimeError::MissingValue)?;

                if let Value::Name(name) = &target {
                    target = c.get(name)?;
                }

                let index = core::to_index(&target)?;

                let key = self
                    .eval(c, right)?
                    .ok_or(RuntimeError::MissingValue)?;

                index.set(strict, &key, val)
            }
            _ => Err(RuntimeError::Message("unexpected expression".to_string())),
        }
    }

    /// Resolves a dot expression to the field it refers to.
    fn resolve_dot(&mut self, c: &mut Context, n: &Node) -> Result<Value, RuntimeError> {
        let Node::DotExpr { left, right, .. } = n else {
            return Err(RuntimeError::Message("invalid reference".to_string()));
        };

        let mut val = self
            .eval(c, left)?
            .ok_or(RuntimeError::MissingValue)?;

        if let Value::Name(name) = &val {
            val = c.get(name)?;
        }

        let field = self
            .eval(c, right)?
            .ok_or(RuntimeError::MissingValue)?;

        select(&val, &field)
    }

    /// Resolves an index expression to the value it refers to.
    fn resolve_index(&mut self, c: &mut Context, n: &Node) -> Result<Value, RuntimeError> {
        let Node::IndExpr { left, right, .. } = n else {
            return Err(RuntimeError::Message("invalid reference".to_string()));
        };

        let mut val = self
            .eval(c, left)?
            .ok_or(RuntimeError::MissingValue)?;

        if let Value::Name(name) = &val {
            val = c.get(name)?;
        }

        let index = core::to_index(&val)?;

        let key = self
            .eval(c, right)?
            .ok_or(RuntimeError::MissingValue)?;

        index.get(&key)
    }
}

/// Selects the named field from the given value.
fn select(val: &Value, field: &Value) -> Result<Value, RuntimeError> {
    match val {
        Value::Request(req) => req.borrow().select(field),
        Value::Response(resp) => resp.select(field),
        Value::Cookie(cookie) => cookie.select(field),
        Value::FormData(data) => data.select(field),
        _ => Err(RuntimeError::NotSelectable { typ: val.type_name() }),
    }
}
