//! Prefix deletion: list a page, delete exactly that page's keys, repeat.
//!
//! A page larger than [`MAX_DELETE_BATCH`] keys is split into consecutive batches in
//! listing order before the next page is requested.
//!
//! S3 has no directory delete, so a prefix is emptied batch by batch. Batches are
//! not transactional as a group: when a later batch fails, objects from earlier
//! batches are already gone and the error is reported as
//! [`S3Error::PartialDelete`]. Running the delete again resumes safely because
//! deleted keys no longer show up in the listing.

use tracing::{debug, info, warn};

use crate::s3::client::S3Client;
use crate::s3::error::{Result, S3Error};
use crate::s3::transport::Transport;
use crate::s3::types::{DeleteBatch, MAX_DELETE_BATCH};

/// Counters for an in-progress prefix delete
#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    batches_committed: usize,
    keys_deleted: usize,
}

impl Progress {
    fn fail(self, source: S3Error) -> S3Error {
        if self.batches_committed == 0 {
            source
        } else {
            S3Error::PartialDelete {
                batches_committed: self.batches_committed,
                keys_deleted: self.keys_deleted,
                source: Box::new(source),
            }
        }
    }
}

impl<T: Transport> S3Client<T> {
    /// Delete every object under `path`.
    ///
    /// Returns `Ok(true)` when everything listed was deleted (including when nothing
    /// existed), `Ok(false)` when the server refused individual keys. Errors after
    /// the first committed batch are wrapped in [`S3Error::PartialDelete`].
    pub async fn delete_path(&self, path: &str) -> Result<bool> {
        let mut pager = self.pages(path);
        let mut progress = Progress::default();
        let mut rejected = 0usize;

        loop {
            let page = match pager.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => return Err(progress.fail(e)),
            };

            for chunk in page.keys().chunks(MAX_DELETE_BATCH) {
                let batch = DeleteBatch::new(chunk.to_vec()).map_err(|e| progress.fail(e))?;
                debug!(
                    path,
                    batch = progress.batches_committed + 1,
                    keys = batch.len(),
                    "sending delete batch"
                );

                let response = self
                    .delete_batch(&batch)
                    .await
                    .map_err(|e| progress.fail(e))?;

                for error in &response.errors {
                    warn!(
                        key = %error.key,
                        code = %error.code,
                        message = %error.message,
                        "object failed in batch delete"
                    );
                }
                rejected += response.errors.len();
                progress.batches_committed += 1;
                progress.keys_deleted += batch.len() - response.errors.len().min(batch.len());
            }
        }

        info!(
            path,
            batches = progress.batches_committed,
            deleted = progress.keys_deleted,
            rejected,
            "prefix delete finished"
        );
        Ok(rejected == 0)
    }
}
