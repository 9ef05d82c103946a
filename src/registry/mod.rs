//! Test declaration capture
//!
//! A test file declares cases imperatively while it is being loaded. The
//! registry is the explicit, per-load accumulator those declarations land
//! in: the worker passes it into the suite function and drains it once
//! loading completes. Insertion order is significant and preserved.

mod suite;

pub use suite::SuiteSet;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

/// Metadata and fixture state handed to each lifecycle hook.
///
/// `state` starts as `Null` and is replaced by whatever the `before`
/// hook returns, so the body and teardown see the merged view.
#[derive(Clone, Debug)]
pub struct CaseContext {
    pub test_case_name: String,
    pub state: Value,
}

impl CaseContext {
    pub fn new(test_case_name: impl Into<String>) -> Self {
        Self {
            test_case_name: test_case_name.into(),
            state: Value::Null,
        }
    }
}

/// Fixture setup: produces the state value merged into the case context.
pub type SetupFn = Arc<dyn Fn(CaseContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Test body or teardown.
pub type CaseFn = Arc<dyn Fn(CaseContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One declared unit of test logic with optional setup/teardown.
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    pub before: Option<SetupFn>,
    pub body: CaseFn,
    pub after: Option<CaseFn>,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

fn setup_fn<F, Fut>(f: F) -> SetupFn
where
    F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |cx| f(cx).boxed())
}

fn case_fn<F, Fut>(f: F) -> CaseFn
where
    F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |cx| f(cx).boxed())
}

/// Spec-object declaration shape: body plus optional hooks, normalized
/// into a [`TestCase`] on registration.
pub struct CaseSpec {
    before: Option<SetupFn>,
    body: CaseFn,
    after: Option<CaseFn>,
}

impl CaseSpec {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            before: None,
            body: case_fn(body),
            after: None,
        }
    }

    pub fn before<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.before = Some(setup_fn(f));
        self
    }

    pub fn after<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after = Some(case_fn(f));
        self
    }
}

/// Ordered accumulator for the file currently being loaded.
#[derive(Default)]
pub struct TestRegistry {
    cases: Vec<TestCase>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a case with a bare body: `(name, body)`.
    pub fn case<F, Fut>(&mut self, name: impl Into<String>, body: F)
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.add(name, CaseSpec::new(body));
    }

    /// Declare a case with fixture setup: `(name, before, body)`.
    pub fn case_with<B, BFut, F, Fut>(&mut self, name: impl Into<String>, before: B, body: F)
    where
        B: Fn(CaseContext) -> BFut + Send + Sync + 'static,
        BFut: Future<Output = Result<Value>> + Send + 'static,
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.add(name, CaseSpec::new(body).before(before));
    }

    /// Declare a case from a full spec: `(name, { before?, body, after? })`.
    pub fn add(&mut self, name: impl Into<String>, spec: CaseSpec) {
        self.cases.push(TestCase {
            name: name.into(),
            before: spec.before,
            body: spec.body,
            after: spec.after,
        });
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Atomically empty the accumulator, yielding the declared cases in
    /// insertion order.
    pub fn drain(&mut self) -> Vec<TestCase> {
        std::mem::take(&mut self.cases)
    }
}
