use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage};
use rdf_pipeline_model::Bindings;
use url::form_urlencoded;

/// The deduplication key of a binding.
///
/// The key lists the `(variable, term)` pairs sorted by variable name. Terms are URL-encoded, as
/// their serialization may contain the separators of the key.
pub fn distinct_key(bindings: &Bindings) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (variable, term) in bindings.sorted() {
        serializer.append_pair(variable.as_str(), &term.to_string());
    }
    serializer.finish()
}

/// Builds the stage for `DISTINCT`. All keys seen so far are kept in memory.
pub fn build_distinct(
    source: PipelineStage<Bindings>,
    context: &ExecutionContext,
) -> PipelineStage<Bindings> {
    context.engine().distinct(source, distinct_key)
}

/// Builds the stage for `REDUCED`, which is evaluated like `DISTINCT`.
pub fn build_reduced(
    source: PipelineStage<Bindings>,
    context: &ExecutionContext,
) -> PipelineStage<Bindings> {
    build_distinct(source, context)
}
