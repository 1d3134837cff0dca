use thiserror::Error;

/// Failures raised while resolving a domain's mail route. Callers on the
/// pipeline path never see these: `has_mail_exchange` folds every variant
/// into "no mail route".
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    Idna(#[source] idna::Errors),
    /// Resolver construction and the MX query itself fail identically for
    /// this crate's purposes, so both land here.
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::Idna(source)
    }

    pub(crate) fn lookup<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Lookup {
            source: Box::new(source),
        }
    }
}
