//! Scripted management client
//!
//! Reports are served page by page from a fixed list. Scanner listings are
//! consumed in order; the last one repeats.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use gvm_maintenance::gmp::{ManagementClient, ReportSummary, ScannerInfo};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockManagementClient {
    pages: Vec<Vec<ReportSummary>>,
    listing_error: Option<String>,
    failing_deletes: HashSet<String>,
    deleted: Mutex<Vec<String>>,
    listed_pages: Mutex<Vec<u32>>,
    scanner_listings: Mutex<VecDeque<Result<Vec<ScannerInfo>, String>>>,
    scanner_calls: AtomicUsize,
}

impl MockManagementClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `reports` into pages of `page_size`.
    pub fn with_reports(mut self, reports: Vec<ReportSummary>, page_size: usize) -> Self {
        self.pages = reports.chunks(page_size.max(1)).map(|c| c.to_vec()).collect();
        self
    }

    /// Serves the same page for every page number.
    pub fn with_repeating_page(mut self, page: Vec<ReportSummary>, repeats: usize) -> Self {
        self.pages = vec![page; repeats];
        self
    }

    pub fn with_listing_error(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    pub fn failing_delete(mut self, id: &str) -> Self {
        self.failing_deletes.insert(id.to_string());
        self
    }

    pub fn with_scanner_listing(self, scanners: Vec<ScannerInfo>) -> Self {
        self.scanner_listings.lock().unwrap().push_back(Ok(scanners));
        self
    }

    pub fn with_scanner_error(self, message: &str) -> Self {
        self.scanner_listings
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn listed_pages(&self) -> Vec<u32> {
        self.listed_pages.lock().unwrap().clone()
    }

    pub fn scanner_calls(&self) -> usize {
        self.scanner_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagementClient for MockManagementClient {
    async fn list_reports(&self, page: u32) -> Result<Vec<ReportSummary>> {
        self.listed_pages.lock().unwrap().push(page);
        if let Some(message) = &self.listing_error {
            bail!("{}", message);
        }
        Ok(self.pages.get(page as usize).cloned().unwrap_or_default())
    }

    async fn delete_report(&self, id: &str) -> Result<()> {
        if self.failing_deletes.contains(id) {
            bail!("Failed to find report '{}'", id);
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn list_scanners(&self) -> Result<Vec<ScannerInfo>> {
        self.scanner_calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut listings = self.scanner_listings.lock().unwrap();
            if listings.len() > 1 {
                listings.pop_front()
            } else {
                listings.front().cloned()
            }
        };

        match next {
            Some(Ok(scanners)) => Ok(scanners),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}
