#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    path: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, path: &'static str) -> Self {
        Self { name, group, path }
    }

    pub fn shallow(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Shallow, path)
    }

    pub fn nested(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Nested, path)
    }

    pub fn failing(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Failing, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// How deep in the routing tree a case is dispatched, and whether it recovers from a failure.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Shallow,
    Nested,
    Failing,
}
