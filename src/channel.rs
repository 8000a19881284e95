//! Immediate or buffered delivery of generated statements
//!
//! In immediate mode every submission is wrapped and executed on the spot.
//! In buffered mode statements are queued and only leave on `flush`, as one
//! program, in submission order.

use crate::script::{injector_invoke, program};
use crate::session::Session;
use crate::{Driver, Result, ScriptResult};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Immediate,
    Buffered,
}

/// What happened to a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Sent to the page; carries what the page returned
    Executed(ScriptResult),
    /// Appended to the buffer
    Queued,
    /// Flush with nothing queued; the page was not contacted
    Empty,
}

impl Dispatch {
    pub fn is_executed(&self) -> bool {
        matches!(self, Dispatch::Executed(_))
    }

    /// The page's JSON result, if the statement was executed
    pub fn value(&self) -> Option<&str> {
        match self {
            Dispatch::Executed(r) => Some(&r.value),
            _ => None,
        }
    }
}

/// Shared statement queue. The on-load child hands a clone of this to its
/// navigation hook.
pub type Queue = Rc<RefCell<Vec<String>>>;

pub struct Channel<D: Driver> {
    session: Session<D>,
    mode: Mode,
    root_element: String,
    queue: Queue,
}

impl<D: Driver> Channel<D> {
    pub fn new(session: Session<D>, mode: Mode, root_element: impl Into<String>) -> Self {
        Self {
            session,
            mode,
            root_element: root_element.into(),
            queue: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    /// Execute now in immediate mode (after `prefix`, when given) or queue in
    /// buffered mode. A buffered submission ignores `prefix`; the prefix is
    /// taken at flush time instead.
    pub fn submit(&self, statement: String, prefix: Option<String>) -> Result<Dispatch> {
        match self.mode {
            Mode::Immediate => {
                let mut statements = Vec::with_capacity(2);
                statements.extend(prefix);
                statements.push(statement);
                self.execute(&statements).map(Dispatch::Executed)
            }
            Mode::Buffered => {
                let mut queue = self.queue.borrow_mut();
                queue.push(statement);
                log::debug!("queued statement ({} pending)", queue.len());
                Ok(Dispatch::Queued)
            }
        }
    }

    /// Send everything queued as one program. The queue is emptied before the
    /// round trip, so it is empty afterwards whether or not the page threw.
    pub fn flush(&self, prefix: Option<String>) -> Result<Dispatch> {
        let queued = std::mem::take(&mut *self.queue.borrow_mut());
        if queued.is_empty() {
            log::debug!("flush: nothing queued");
            return Ok(Dispatch::Empty);
        }
        log::debug!("flushing {} queued statement(s)", queued.len());
        let mut statements = Vec::with_capacity(queued.len() + 1);
        statements.extend(prefix);
        statements.extend(queued);
        self.execute(&statements).map(Dispatch::Executed)
    }

    /// Run statements right away regardless of mode
    pub fn execute<S: AsRef<str>>(&self, statements: &[S]) -> Result<ScriptResult> {
        let script = injector_invoke(&self.root_element, &program(statements));
        self.session.execute(&script)
    }

    /// Snapshot of the pending statements
    pub fn pending(&self) -> Vec<String> {
        self.queue.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    pub fn queue(&self) -> Queue {
        Rc::clone(&self.queue)
    }
}
