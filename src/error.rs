use thiserror::Error;

/// The only errors that reach callers of the extraction pipeline.
///
/// Everything inside the data-fetch degradation chain is recovered locally;
/// these two cover the cases the caller must be told apart: an input that is
/// not a vendor link at all, and a link no strategy could turn into a product.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(
        "invalid MercadoLivre link: {url} — use a direct product link \
         (containing \"/p/\" or an MLB code) or an affiliate short link"
    )]
    InvalidLink { url: String },

    #[error(
        "could not derive a product from {url} — every resolution strategy \
         came up empty; try the direct product link (containing \"/p/\" or \
         an MLB code) instead"
    )]
    ResolutionExhausted { url: String },
}

/// Transport-level failure. HTTP error statuses are not errors here; they
/// come back inside the response so each strategy can decide for itself.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
}
