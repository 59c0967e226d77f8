use crate::error::AppError;
use crate::models::{MetadataOptions, MetadataRecord};
use crate::traits::{Extractor, Fetcher};

/// Orchestrates a metadata request: fetch → check status → extract → merge.
///
/// Generic over the fetcher and extractor via traits, so the pipeline can be
/// tested without real HTTP.
pub struct MetadataService<F, E>
where
    F: Fetcher,
    E: Extractor,
{
    fetcher: F,
    extractor: E,
}

impl<F, E> MetadataService<F, E>
where
    F: Fetcher,
    E: Extractor,
{
    pub fn new(fetcher: F, extractor: E) -> Self {
        Self { fetcher, extractor }
    }

    /// Fetch `url` and extract the requested metadata from it.
    ///
    /// A non-2xx response is not an error: the returned record then holds
    /// only `url` and `status`. Transport failures and strict-mode
    /// extraction failures are returned as errors.
    ///
    /// Relative references are resolved against `url` as requested, even if
    /// the client followed redirects to a different location.
    pub async fn metadata_from_url(
        &self,
        url: &str,
        options: &MetadataOptions,
    ) -> Result<MetadataRecord, AppError> {
        tracing::info!("Fetching {}", url);
        let response = self.fetcher.fetch(url).await?;
        let status = response.status_line();

        if !response.is_success() {
            tracing::warn!(%status, "Fetch did not succeed, skipping extraction");
            return Ok(MetadataRecord::failed(url, status));
        }

        tracing::info!("Fetched {} bytes of HTML ({})", response.body.len(), status);
        if !response.final_url.is_empty() && response.final_url != url {
            tracing::debug!(
                final_url = %response.final_url,
                "Response was redirected; resolving links against the requested URL"
            );
        }

        let extracted = self.extractor.extract(
            &response.body,
            response.content_type.as_deref(),
            url,
            options,
        )?;
        tracing::debug!(keys = extracted.len(), "Extraction complete");

        Ok(MetadataRecord::succeeded(url, status, extracted))
    }
}
