//! Lazy cons lists.
//!
//! A [`LazyList`] is either empty or a cell holding an element (`car`) and the
//! rest of the list (`cdr`). Elements are stored as given, thunks included, and
//! the rest of the list is produced on first access and then kept. Reading one
//! element never computes the others.
//!
//! Forcing a list (it implements [`Object::normalize`]) yields the tuple of
//! its forced elements, so a lazy list compares equal to the tuple it spells.

use std::cell::RefCell;
use std::rc::Rc;

use ecow::{EcoString, eco_format};
use once_cell::unsync::OnceCell;

use crate::{
    errors::{Error, Result},
    ops::{BinaryOp, CompareOp, arith, protocol},
    thunk::force,
    values::{Object, Value},
};

type Producer = dyn Fn() -> Result<LazyList>;

enum Tail {
    Ready(LazyList),
    /// Produces the rest on demand. Kept after a failure so access can retry.
    Deferred(Rc<Producer>),
    Producing,
}

struct ConsCell {
    car: Value,
    cdr: RefCell<Tail>,
    strict: OnceCell<Rc<[Value]>>,
}

impl ConsCell {
    fn new(car: Value, cdr: Tail) -> Rc<ConsCell> {
        Rc::new(ConsCell {
            car,
            cdr: RefCell::new(cdr),
            strict: OnceCell::new(),
        })
    }

    fn tail(&self) -> Result<LazyList> {
        let producer = match &*self.cdr.borrow() {
            Tail::Ready(list) => return Ok(list.clone()),
            Tail::Deferred(producer) => producer.clone(),
            Tail::Producing => return Err(Error::CyclicForce),
        };
        self.cdr.replace(Tail::Producing);
        match producer() {
            Ok(list) => {
                self.cdr.replace(Tail::Ready(list.clone()));
                Ok(list)
            }
            Err(error) => {
                self.cdr.replace(Tail::Deferred(producer));
                Err(error)
            }
        }
    }
}

/// Unlinks uniquely owned successors one by one; a long list would otherwise
/// drop recursively.
impl Drop for ConsCell {
    fn drop(&mut self) {
        let mut next = take_ready(self.cdr.get_mut());
        while let Some(cell) = next {
            next = match Rc::try_unwrap(cell) {
                Ok(mut cell) => take_ready(cell.cdr.get_mut()),
                Err(_) => None,
            };
        }
    }
}

fn take_ready(tail: &mut Tail) -> Option<Rc<ConsCell>> {
    match std::mem::replace(tail, Tail::Producing) {
        Tail::Ready(LazyList(next)) => next,
        _ => None,
    }
}

/// A lazily produced, memoizing singly linked list.
#[derive(Clone, Default)]
pub struct LazyList(Option<Rc<ConsCell>>);

impl LazyList {
    /// The empty list.
    pub fn nil() -> LazyList {
        LazyList(None)
    }

    /// A cell whose rest is already known.
    pub fn cons(car: impl Into<Value>, cdr: LazyList) -> LazyList {
        LazyList(Some(ConsCell::new(car.into(), Tail::Ready(cdr))))
    }

    /// A cell whose rest is produced by `cdr` on first access.
    pub fn cons_with<F>(car: impl Into<Value>, cdr: F) -> LazyList
    where
        F: Fn() -> Result<LazyList> + 'static,
    {
        LazyList(Some(ConsCell::new(car.into(), Tail::Deferred(Rc::new(cdr)))))
    }

    /// A list of the given elements, in order.
    pub fn from_values(items: impl IntoIterator<Item = Value>) -> LazyList {
        let items: Vec<Value> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(LazyList::nil(), |rest, item| LazyList::cons(item, rest))
    }

    /// A list drawing its elements from `iterable` as they are reached.
    ///
    /// The first element is pulled right away (it decides between empty and
    /// non-empty); every later one only when the previous cell's rest is read.
    pub fn from_iter(iterable: &Value) -> Result<LazyList> {
        let iterator = protocol::iter(&force(iterable)?)?;
        pull(iterator)
    }

    /// `from, from + by, from + 2 * by, ...`, up to and including `to` when it
    /// is given, without end otherwise.
    pub fn range(from: &Value, to: Option<&Value>, by: &Value) -> Result<LazyList> {
        let from = force(from)?;
        let to = to.map(force).transpose()?;
        let by = force(by)?;
        let mut last: Option<Value> = None;
        let mut exhausted = false;
        let steps = Value::iterator_from_fn(move || {
            if exhausted {
                return Ok(None);
            }
            let value = match &last {
                None => from.clone(),
                Some(last) => arith::binary(BinaryOp::Add, last, &by)?,
            };
            if let Some(to) = &to {
                if !arith::compare(CompareOp::Le, &value, to)? {
                    exhausted = true;
                    return Ok(None);
                }
            }
            last = Some(value.clone());
            Ok(Some(value))
        });
        LazyList::from_iter(&steps)
    }

    /// The list wrapped by `value`, if it is one.
    pub fn from_value(value: &Value) -> Option<LazyList> {
        value.downcast_ref::<LazyList>().cloned()
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_none()
    }

    /// First element, unforced.
    pub fn car(&self) -> Option<&Value> {
        self.0.as_ref().map(|cell| &cell.car)
    }

    /// Everything after the first element. Fails on the empty list.
    pub fn cdr(&self) -> Result<LazyList> {
        match &self.0 {
            Some(cell) => cell.tail(),
            None => Err(Error::value_error("the empty lazy list has no rest")),
        }
    }

    /// Element at `index`, unforced. Negative indices count from the end,
    /// which forces the whole list.
    pub fn get(&self, index: i64) -> Result<Value> {
        let position = if index < 0 {
            index + self.len()? as i64
        } else {
            index
        };
        if position < 0 {
            return Err(Error::Index {
                index,
                len: self.len()?,
            });
        }
        let mut cell = self.clone();
        for walked in 0..position as usize {
            if cell.is_nil() {
                return Err(Error::Index { index, len: walked });
            }
            cell = cell.cdr()?;
        }
        match cell.car() {
            Some(car) => Ok(car.clone()),
            None => Err(Error::Index {
                index,
                len: position as usize,
            }),
        }
    }

    /// The forced elements. Memoized on the head cell.
    pub fn strict(&self) -> Result<Rc<[Value]>> {
        let Some(head) = &self.0 else {
            return Ok(Rc::from(Vec::new()));
        };
        if let Some(items) = head.strict.get() {
            return Ok(items.clone());
        }
        let items = self
            .items()
            .map(|item| force(&item?))
            .collect::<Result<Vec<_>>>()?;
        let items: Rc<[Value]> = items.into();
        let _ = head.strict.set(items.clone());
        Ok(items)
    }

    /// Number of elements. Forces the list.
    pub fn len(&self) -> Result<usize> {
        Ok(self.strict()?.len())
    }

    /// Unforced elements in order.
    pub fn items(&self) -> Items {
        Items {
            head: Some(self.clone()),
            last: None,
        }
    }

    /// How many elements equal `value`.
    pub fn count(&self, value: &Value) -> Result<usize> {
        let mut count = 0;
        for item in self.items() {
            if arith::equals(&item?, value)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Position of the first element equal to `value` within `start..stop`.
    pub fn index_of(&self, value: &Value, start: usize, stop: Option<usize>) -> Result<usize> {
        for (position, item) in self.items().enumerate() {
            if stop.is_some_and(|stop| position >= stop) {
                break;
            }
            let item = item?;
            if position >= start && arith::equals(&item, value)? {
                return Ok(position);
            }
        }
        Err(Error::value_error(eco_format!("{} is not in list", value)))
    }
}

fn pull(iterator: Value) -> Result<LazyList> {
    match protocol::next(&iterator)? {
        None => Ok(LazyList::nil()),
        Some(car) => Ok(LazyList::cons_with(car, move || pull(iterator.clone()))),
    }
}

impl From<LazyList> for Value {
    fn from(list: LazyList) -> Self {
        Value::object(list)
    }
}

/// Iterator over the unforced elements of a [`LazyList`].
///
/// The rest of a cell is only produced when the element after it is asked
/// for. A failure to produce it ends the iteration.
pub struct Items {
    head: Option<LazyList>,
    last: Option<Rc<ConsCell>>,
}

impl Iterator for Items {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        let cell = match self.last.take() {
            None => self.head.take()?,
            Some(last) => match last.tail() {
                Ok(tail) => tail,
                Err(error) => return Some(Err(error)),
            },
        };
        let current = cell.0?;
        let car = current.car.clone();
        self.last = Some(current);
        Some(Ok(car))
    }
}

/// `iter()` of a lazy list.
struct ListIter(RefCell<Items>);

impl Object for ListIter {
    fn type_name(&self) -> &str {
        "lazy_list_iterator"
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Option<Value>> {
        self.0.borrow_mut().next().transpose()
    }
}

impl Object for LazyList {
    fn type_name(&self) -> &str {
        "lazy_list"
    }

    fn has_normalize(&self) -> bool {
        true
    }

    fn normalize(&self, _this: &Value) -> Result<Value> {
        Ok(Value::Tuple(self.strict()?))
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        match (name, self.car()) {
            ("car", Some(car)) => Ok(car.clone()),
            ("cdr", Some(_)) => Ok(self.cdr()?.into()),
            _ => Err(Error::Attribute {
                type_name: self.type_name().into(),
                name: name.into(),
            }),
        }
    }

    fn get_item(&self, key: &Value) -> Result<Value> {
        self.get(protocol::to_index(&force(key)?)?)
    }

    fn contains(&self, item: &Value) -> Option<Result<bool>> {
        for element in self.items() {
            match element.and_then(|element| arith::equals(&element, item)) {
                Ok(true) => return Some(Ok(true)),
                Ok(false) => {}
                Err(error) => return Some(Err(error)),
            }
        }
        Some(Ok(false))
    }

    fn iter(&self, _this: &Value) -> Result<Value> {
        Ok(Value::object(ListIter(RefCell::new(self.items()))))
    }

    fn len(&self) -> Option<Result<usize>> {
        Some(LazyList::len(self))
    }

    fn to_bool(&self) -> Result<bool> {
        Ok(!self.is_nil())
    }

    fn repr(&self) -> EcoString {
        match self.strict() {
            Ok(items) => eco_format!("{}", Value::Tuple(items)),
            Err(error) => eco_format!("<lazy_list: {}>", error),
        }
    }

    /// Equality with whatever `other` forces to, compared as the tuple of
    /// this list's forced elements.
    fn compare(&self, op: CompareOp, other: &Value) -> Option<Result<bool>> {
        if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
            return None;
        }
        Some(self.strict().and_then(|items| {
            arith::compare(op, &Value::Tuple(items), &force(other)?)
        }))
    }
}
