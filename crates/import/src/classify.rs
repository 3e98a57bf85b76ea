use bankin_core::{
    starter_categories, Category, CategoryId, CategoryStore, Direction, OwnerId,
    OTHER_CATEGORY_NAME,
};
use std::sync::Arc;
use std::time::Duration;

use crate::delegate::{
    match_candidate, DelegateClassifier, DelegateOutcome, DelegateRequest, HttpDelegate,
};
use crate::error::{ImportError, Result, SetupError};
use crate::rules::KeywordRules;
use crate::settings::ImportSettings;

pub const DEFAULT_DELEGATE_TIMEOUT: Duration = Duration::from_secs(3);

/// Assigns categories: delegate first, keyword rules for expenses second,
/// the catch-all category last.
pub struct Classifier {
    rules: KeywordRules,
    delegate: Option<Arc<dyn DelegateClassifier>>,
    delegate_timeout: Duration,
}

impl Classifier {
    pub fn new(rules: KeywordRules) -> Self {
        Self {
            rules,
            delegate: None,
            delegate_timeout: DEFAULT_DELEGATE_TIMEOUT,
        }
    }

    /// The configured rule file (or the built-in table), plus the HTTP
    /// delegate when settings name one.
    pub fn from_settings(settings: &ImportSettings) -> std::result::Result<Self, SetupError> {
        let rules = match &settings.rules_path {
            Some(path) => KeywordRules::from_path(path)?,
            None => KeywordRules::default_rules()?,
        };
        let mut classifier = Self::new(rules);

        if let Some(delegate) = &settings.delegate {
            let http = HttpDelegate::new(
                delegate.endpoint.clone(),
                delegate.api_key.clone(),
                delegate.timeout(),
            )?;
            tracing::info!("Using delegate classifier at {}", http.endpoint());
            classifier = classifier.with_delegate(Arc::new(http), delegate.timeout());
        }
        Ok(classifier)
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn DelegateClassifier>, timeout: Duration) -> Self {
        self.delegate = Some(delegate);
        self.delegate_timeout = timeout;
        self
    }

    pub fn rules(&self) -> &KeywordRules {
        &self.rules
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// Picks one of `candidates` (filtered to `direction`) for `description`.
    /// Fails only when no candidate has the requested direction.
    pub async fn classify(
        &self,
        description: &str,
        direction: Direction,
        candidates: &[Category],
    ) -> Result<CategoryId> {
        let pool: Vec<&Category> = candidates
            .iter()
            .filter(|c| c.direction == direction)
            .collect();
        if pool.is_empty() {
            return Err(ImportError::NoCategories(direction));
        }
        let names: Vec<&str> = pool.iter().map(|c| c.name.as_str()).collect();
        let by_name = |name: &str| pool.iter().find(|c| c.name == name).map(|c| c.id);

        if let DelegateOutcome::Matched(answer) = self.ask_delegate(description, direction, &names).await {
            if let Some(id) = match_candidate(&answer, &names).and_then(by_name) {
                tracing::debug!("Delegate classified '{description}' as {answer}");
                return Ok(id);
            }
            tracing::debug!("Delegate answer '{answer}' names no {direction} category");
        }

        if direction == Direction::Expense {
            if let Some(id) = self
                .rules
                .match_category(description, &names)
                .and_then(by_name)
            {
                return Ok(id);
            }
        }

        let fallback = pool
            .iter()
            .find(|c| c.name == OTHER_CATEGORY_NAME)
            .unwrap_or(&pool[0]);
        Ok(fallback.id)
    }

    /// Never fails: errors and timeouts count as abstentions.
    async fn ask_delegate(
        &self,
        description: &str,
        direction: Direction,
        names: &[&str],
    ) -> DelegateOutcome {
        let Some(delegate) = &self.delegate else {
            return DelegateOutcome::Abstained;
        };

        let request = DelegateRequest {
            description: description.to_string(),
            direction,
            candidates: names.iter().map(|n| n.to_string()).collect(),
        };

        match tokio::time::timeout(self.delegate_timeout, delegate.classify(&request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!("Delegate classifier failed, using rules: {e}");
                DelegateOutcome::Abstained
            }
            Err(_) => {
                tracing::warn!(
                    "Delegate classifier timed out after {:?}, using rules",
                    self.delegate_timeout
                );
                DelegateOutcome::Abstained
            }
        }
    }
}

/// The owner's categories for `direction`, provisioning the starter set first
/// when there are none.
pub async fn ensure_categories<S>(store: &S, owner: OwnerId, direction: Direction) -> Result<Vec<Category>>
where
    S: CategoryStore + ?Sized,
{
    let existing = store.find_categories(owner, direction).await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let starters = starter_categories(owner, direction, &[]);
    let inserted = store.insert_categories(&starters).await?;
    tracing::info!("Provisioned {inserted} {direction} categories for owner {owner}");

    let provisioned = store.find_categories(owner, direction).await?;
    if provisioned.is_empty() {
        return Err(ImportError::NoCategories(direction));
    }
    Ok(provisioned)
}
