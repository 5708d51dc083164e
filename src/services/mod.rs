//! Business logic services

pub mod catalog;
pub mod email;
pub mod loans;
pub mod overdue;

use std::sync::Arc;

use crate::{config::OverdueConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub overdue: overdue::OverdueScanner,
}

impl Services {
    /// Wire the services over the given storage and notification channel
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn email::Notifier>,
        overdue_config: &OverdueConfig,
    ) -> Self {
        let catalog = catalog::CatalogService::new(repository.books);
        let loans = loans::LoansService::new(repository.loans, catalog.clone());
        let overdue =
            overdue::OverdueScanner::new(loans.clone(), notifier, overdue_config.grace_days);
        Self {
            catalog,
            loans,
            overdue,
        }
    }
}
