//! Cursor-paginated enumeration of a whole collection.

use futures::{future, Stream, StreamExt};
use serde_json::Value;
use std::pin::pin;

use super::MetadataProvider;
use crate::error::SoulburnError;

/// Largest page the provider serves.
pub const PAGE_SIZE: usize = 100;

/// Why an enumeration stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Pages fetched successfully before the failing request.
    pub after_pages: usize,
    pub error: SoulburnError,
}

/// A fully collected enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enumeration {
    pub records: Vec<Value>,
    pub truncated: Option<Truncation>,
}

impl Enumeration {
    /// The error of the very first page request, if that is where enumeration stopped. A
    /// successful empty page is not a failure.
    pub fn first_page_error(&self) -> Option<&SoulburnError> {
        self.truncated
            .as_ref()
            .filter(|t| t.after_pages == 0)
            .map(|t| &t.error)
    }
}

enum Fetched {
    Record(Value),
    Truncated(Truncation),
}

/// Lazily enumerates every raw record of `contract`, [`PAGE_SIZE`] at a time.
///
/// Enumeration ends, without an error, on the first of:
/// - a page shorter than the requested size,
/// - a page with no next-page cursor (a full page without one is logged as a possible
///   under-fetch),
/// - a cursor identical to the one just requested,
/// - a failed page request. Records already yielded are kept.
///
/// Use [`collect_collection`] to learn whether a failed request ended the enumeration.
pub fn fetch_collection<'a>(
    provider: &'a dyn MetadataProvider,
    contract: &'a str,
) -> impl Stream<Item = Value> + Send + 'a {
    fetch_collection_with(provider, contract, PAGE_SIZE)
}

/// [`fetch_collection`] with an explicit page size.
pub fn fetch_collection_with<'a>(
    provider: &'a dyn MetadataProvider,
    contract: &'a str,
    page_size: usize,
) -> impl Stream<Item = Value> + Send + 'a {
    enumerate(provider, contract, page_size).filter_map(|fetched| {
        future::ready(match fetched {
            Fetched::Record(record) => Some(record),
            Fetched::Truncated(_) => None,
        })
    })
}

/// Collects the whole of [`fetch_collection`], keeping the failure that cut it short.
pub async fn collect_collection(provider: &dyn MetadataProvider, contract: &str) -> Enumeration {
    collect_collection_with(provider, contract, PAGE_SIZE).await
}

/// [`collect_collection`] with an explicit page size.
pub async fn collect_collection_with(
    provider: &dyn MetadataProvider,
    contract: &str,
    page_size: usize,
) -> Enumeration {
    let mut enumeration = Enumeration::default();
    let mut fetched = pin!(enumerate(provider, contract, page_size));
    while let Some(item) = fetched.next().await {
        match item {
            Fetched::Record(record) => enumeration.records.push(record),
            Fetched::Truncated(truncation) => enumeration.truncated = Some(truncation),
        }
    }
    enumeration
}

fn enumerate<'a>(
    provider: &'a dyn MetadataProvider,
    contract: &'a str,
    page_size: usize,
) -> impl Stream<Item = Fetched> + Send + 'a {
    async_stream::stream! {
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut total = 0usize;

        loop {
            let page = match provider
                .collection_page(contract, page_size, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    tracing::warn!(
                        contract,
                        pages,
                        total,
                        "Collection enumeration truncated by a failed page: {error}"
                    );
                    yield Fetched::Truncated(Truncation { after_pages: pages, error });
                    break;
                }
            };

            pages += 1;
            let count = page.records.len();
            total += count;
            tracing::info!(contract, "Fetched page {pages} with {count} records (total: {total})");

            let next_cursor = page.next_cursor;
            for record in page.records {
                yield Fetched::Record(record);
            }

            if count < page_size {
                tracing::info!(
                    contract,
                    "Got fewer than {page_size} records ({count}), reached end of collection"
                );
                break;
            }

            match next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(
                        contract,
                        "Provider repeated cursor {next}, stopping pagination with {total} records"
                    );
                    break;
                }
                Some(next) => {
                    tracing::debug!(contract, "Continuing pagination with cursor {next}");
                    cursor = Some(next);
                }
                None => {
                    tracing::warn!(
                        contract,
                        "Got a full page of {count} records but no next cursor; there may be more \
                         results. Pagination complete with {total} records"
                    );
                    break;
                }
            }
        }
    }
}
