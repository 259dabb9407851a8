use crate::source::SourceContext;
use tracing::debug;

#[cfg(feature = "aopwiki")]
pub mod aopwiki;
#[cfg(feature = "bao")]
pub mod bao;
#[cfg(feature = "cellosaurus")]
pub mod cellosaurus;
#[cfg(feature = "compoundcloud")]
pub mod compoundcloud;
#[cfg(feature = "crossref")]
pub mod crossref;
#[cfg(feature = "mimetypes")]
pub mod mimetypes;
#[cfg(feature = "orcid")]
pub mod orcid;
#[cfg(feature = "pubchem")]
pub mod pubchem;
#[cfg(feature = "ror")]
pub mod ror;

/// Called when an identifier-shaped query resolved to nothing. Returns
/// whether the connector should go on to search the query as text.
#[allow(dead_code)]
pub(crate) fn continue_after_unresolved(ctx: &SourceContext, id: &str) -> bool {
    let fallback = ctx.falls_back_to_text();
    debug!(
        target: "lookups.search",
        source = ctx.spec().name,
        id,
        fallback,
        "identifier did not resolve"
    );
    fallback
}
