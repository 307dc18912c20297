use crate::EvaluatedValue;
use rdf_pipeline_model::{NamedNode, Term, ThinResult};
use rustc_hash::FxHashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A reference-counted pointer to a [CustomFunction].
pub type CustomFunctionRef = Arc<dyn CustomFunction>;

/// A function that extends SPARQL with a new IRI-named function.
///
/// A custom function may produce several values by returning an [EvaluatedValue::Sequence]. In a
/// `BIND`, every produced term results in its own solution.
pub trait CustomFunction: Debug + Send + Sync {
    /// The IRI under which the function is called.
    fn name(&self) -> &NamedNode;

    /// Returns whether the function accepts `count` arguments.
    fn accepts_arity(&self, _count: usize) -> bool {
        true
    }

    /// Evaluates the function on already evaluated arguments.
    fn evaluate(&self, args: &[Term]) -> ThinResult<EvaluatedValue>;
}

type FunctionImpl = dyn Fn(&[Term]) -> ThinResult<EvaluatedValue> + Send + Sync;

/// A [CustomFunction] backed by a closure.
pub struct FnCustomFunction {
    name: NamedNode,
    implementation: Box<FunctionImpl>,
}

impl FnCustomFunction {
    pub fn new(
        name: NamedNode,
        implementation: impl Fn(&[Term]) -> ThinResult<EvaluatedValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            implementation: Box::new(implementation),
        }
    }
}

impl CustomFunction for FnCustomFunction {
    fn name(&self) -> &NamedNode {
        &self.name
    }

    fn evaluate(&self, args: &[Term]) -> ThinResult<EvaluatedValue> {
        (self.implementation)(args)
    }
}

impl Debug for FnCustomFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCustomFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Holds the custom functions that are available to queries.
///
/// The built-in functions of SPARQL are always available and need not be registered. Cloning a
/// registry is cheap as the functions are shared.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<NamedNode, CustomFunctionRef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function`, replacing a previously registered function with the same name.
    pub fn register(&mut self, function: CustomFunctionRef) -> Option<CustomFunctionRef> {
        self.functions.insert(function.name().clone(), function)
    }

    /// Registers a closure as function called `name`.
    pub fn register_fn(
        &mut self,
        name: NamedNode,
        implementation: impl Fn(&[Term]) -> ThinResult<EvaluatedValue> + Send + Sync + 'static,
    ) -> Option<CustomFunctionRef> {
        self.register(Arc::new(FnCustomFunction::new(name, implementation)))
    }

    pub fn get(&self, name: &NamedNode) -> Option<&CustomFunctionRef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &NamedNode) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the names of all registered functions, sorted.
    pub fn names(&self) -> Vec<&NamedNode> {
        let mut names = self.functions.keys().collect::<Vec<_>>();
        names.sort_by(|lhs, rhs| lhs.as_str().cmp(rhs.as_str()));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::Literal;

    #[test]
    fn register_and_replace() {
        let name = NamedNode::new_unchecked("http://example.com/answer");
        let mut registry = FunctionRegistry::new();

        assert!(registry
            .register_fn(name.clone(), |_| Ok(Term::from(Literal::from(41_i64)).into()))
            .is_none());
        assert!(registry
            .register_fn(name.clone(), |_| Ok(Term::from(Literal::from(42_i64)).into()))
            .is_some());

        let function = registry.get(&name).unwrap();
        assert_eq!(
            function.evaluate(&[]).unwrap().into_term().unwrap(),
            Literal::from(42_i64).into()
        );
        assert_eq!(registry.names(), vec![&name]);
    }
}
