//! Explicit expression trees.
//!
//! [`ExprTree::parse`] snapshots the pending part of a graph into a tree of
//! calls, and [`ExprTree::compile`] turns a tree back into thunks. Shared nodes
//! become shared subtrees and vice versa, so a diamond in the graph stays a
//! diamond and is only computed once after compiling.

use std::fmt;
use std::rc::Rc;

use ecow::EcoString;
use hashbrown::{HashMap, HashSet};

use crate::{
    errors::{Error, Result},
    graph::Children,
    options::ForceOptions,
    thunk::{NodeKind, Thunk},
    values::{Kwargs, Value},
};

pub enum TreeNode {
    Call {
        kind: NodeKind,
        func: ExprTree,
        args: Vec<ExprTree>,
        /// Sorted by name.
        kwargs: Vec<(EcoString, ExprTree)>,
    },
    Normal(Value),
}

/// Shared handle to a tree node.
#[derive(Clone)]
pub struct ExprTree(Rc<TreeNode>);

impl ExprTree {
    pub fn call(
        func: ExprTree,
        args: impl IntoIterator<Item = ExprTree>,
        kwargs: impl IntoIterator<Item = (EcoString, ExprTree)>,
    ) -> Self {
        let mut kwargs: Vec<_> = kwargs.into_iter().collect();
        kwargs.sort_by(|a, b| a.0.cmp(&b.0));
        ExprTree(Rc::new(TreeNode::Call {
            kind: NodeKind::DEFAULT,
            func,
            args: args.into_iter().collect(),
            kwargs,
        }))
    }

    pub fn normal(value: Value) -> Self {
        ExprTree(Rc::new(TreeNode::Normal(value)))
    }

    pub fn node(&self) -> &TreeNode {
        &self.0
    }

    pub fn is_call(&self) -> bool {
        matches!(*self.0, TreeNode::Call { .. })
    }

    pub fn ptr_eq(&self, other: &ExprTree) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Build the tree of `value`. Pending thunks become calls; everything else
    /// (forced thunks included) becomes a leaf.
    ///
    /// Fails with a value error if a pending node reaches itself, and with
    /// [`Error::RecursionLimit`] if calls nest deeper than the default
    /// [`ForceOptions::max_depth`].
    pub fn parse(value: &Value) -> Result<ExprTree> {
        ExprTree::parse_with(value, &ForceOptions::default())
    }

    /// [`ExprTree::parse`] with an explicit nesting limit.
    pub fn parse_with(value: &Value, options: &ForceOptions) -> Result<ExprTree> {
        Parser::new(options.max_depth).parse(value)
    }

    /// Rebuild a thunk graph equivalent to this tree.
    pub fn compile(&self) -> Value {
        let mut memo = HashMap::new();
        self.compile_with(&mut memo)
    }

    fn compile_with(&self, memo: &mut HashMap<*const TreeNode, Value>) -> Value {
        let key = Rc::as_ptr(&self.0);
        if let Some(value) = memo.get(&key) {
            return value.clone();
        }
        let value = match &*self.0 {
            TreeNode::Normal(value) => value.clone(),
            TreeNode::Call {
                kind,
                func,
                args,
                kwargs,
            } => {
                let function = func.compile_with(memo);
                let args = args.iter().map(|arg| arg.compile_with(memo)).collect();
                let kwargs = if kwargs.is_empty() {
                    None
                } else {
                    Some(
                        kwargs
                            .iter()
                            .map(|(name, arg)| (name.clone(), arg.compile_with(memo)))
                            .collect::<Kwargs>(),
                    )
                };
                Value::Thunk(Thunk::pending(*kind, function, args, kwargs))
            }
        };
        memo.insert(key, value.clone());
        value
    }

    /// Subtrees in pre-order: a call, then its function, its arguments and
    /// its keyword arguments.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse { stack: vec![self] }
    }

    /// Rebuild the tree, replacing every subtree for which `f` returns a
    /// replacement. Replacements are not visited again.
    pub fn subs<F>(&self, f: &mut F) -> ExprTree
    where
        F: FnMut(&ExprTree) -> Option<ExprTree>,
    {
        if let Some(replacement) = f(self) {
            return replacement;
        }
        match &*self.0 {
            TreeNode::Normal(_) => self.clone(),
            TreeNode::Call {
                kind,
                func,
                args,
                kwargs,
            } => ExprTree(Rc::new(TreeNode::Call {
                kind: *kind,
                func: func.subs(f),
                args: args.iter().map(|arg| arg.subs(f)).collect(),
                kwargs: kwargs
                    .iter()
                    .map(|(name, arg)| (name.clone(), arg.subs(f)))
                    .collect(),
            })),
        }
    }

    /// Whether `other` occurs in this tree (structurally).
    pub fn contains(&self, other: &ExprTree) -> bool {
        self.traverse().any(|subtree| subtree == other)
    }
}

struct Parser {
    memo: HashMap<usize, ExprTree>,
    active: HashSet<usize>,
    max_depth: usize,
}

impl Parser {
    fn new(max_depth: usize) -> Self {
        Parser {
            memo: HashMap::new(),
            active: HashSet::new(),
            max_depth,
        }
    }

    fn parse(&mut self, value: &Value) -> Result<ExprTree> {
        let Value::Thunk(thunk) = value else {
            return Ok(ExprTree::normal(value.clone()));
        };
        let addr = thunk.addr();
        if let Some(tree) = self.memo.get(&addr) {
            return Ok(tree.clone());
        }
        if self.active.len() >= self.max_depth {
            return Err(Error::RecursionLimit {
                depth: self.active.len(),
                max_depth: self.max_depth,
            });
        }
        if !self.active.insert(addr) {
            return Err(Error::value_error("cannot build a tree from a cyclic graph"));
        }
        let tree = match thunk.children() {
            Ok(Children::Normal(value)) => Ok(ExprTree::normal(value)),
            Ok(Children::Pending {
                function,
                args,
                kwargs,
            }) => self.parse_call(thunk.kind(), &function, &args, &kwargs),
            Err(error) => Err(error),
        };
        self.active.remove(&addr);
        let tree = tree?;
        self.memo.insert(addr, tree.clone());
        Ok(tree)
    }

    fn parse_call(
        &mut self,
        kind: NodeKind,
        function: &Value,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<ExprTree> {
        let func = self.parse(function)?;
        let args = args
            .iter()
            .map(|arg| self.parse(arg))
            .collect::<Result<Vec<_>>>()?;
        let mut names: Vec<&EcoString> = kwargs.keys().collect();
        names.sort();
        let mut parsed = Vec::with_capacity(names.len());
        for name in names {
            parsed.push((name.clone(), self.parse(&kwargs[name])?));
        }
        Ok(ExprTree(Rc::new(TreeNode::Call {
            kind,
            func,
            args,
            kwargs: parsed,
        })))
    }
}

/// Pre-order iterator over subtrees.
pub struct Traverse<'a> {
    stack: Vec<&'a ExprTree>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a ExprTree;

    fn next(&mut self) -> Option<&'a ExprTree> {
        let tree = self.stack.pop()?;
        if let TreeNode::Call {
            func, args, kwargs, ..
        } = &*tree.0
        {
            self.stack.extend(kwargs.iter().rev().map(|(_, arg)| arg));
            self.stack.extend(args.iter().rev());
            self.stack.push(func);
        }
        Some(tree)
    }
}

/// Structural equality. Leaves compare with [`Value`]'s `==`, which never
/// forces.
impl PartialEq for ExprTree {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (TreeNode::Normal(a), TreeNode::Normal(b)) => a == b,
            (
                TreeNode::Call {
                    kind: k1,
                    func: f1,
                    args: a1,
                    kwargs: kw1,
                },
                TreeNode::Call {
                    kind: k2,
                    func: f2,
                    args: a2,
                    kwargs: kw2,
                },
            ) => k1 == k2 && f1 == f2 && a1 == a2 && kw1 == kw2,
            _ => false,
        }
    }
}

impl fmt::Display for ExprTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            TreeNode::Normal(Value::Function(function)) => write!(f, "{}", function.name()),
            TreeNode::Normal(Value::Operator(wrapper)) => write!(f, "{}", wrapper.name()),
            TreeNode::Normal(value) => write!(f, "{}", value),
            TreeNode::Call {
                func, args, kwargs, ..
            } => {
                write!(f, "{}(", func)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (name, arg) in kwargs {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", name, arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for ExprTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
