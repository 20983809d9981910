//! State behind the admin view: an editing buffer over one rate snapshot.
//!
//! Every action leaves a status message. Failed actions leave the buffer as it
//! was so the edit can simply be retried.
use crate::core::auth::AdminAuth;
use crate::core::draft::DraftCache;
use crate::core::rate::{ExchangeRate, Period};
use crate::core::sync::RateSyncService;
use tracing::{error, info, warn};

pub struct AdminEditor {
    service: RateSyncService,
    drafts: DraftCache,
    auth: AdminAuth,
    authenticated: bool,
    rates: Vec<ExchangeRate>,
    current_period: Period,
    message: String,
}

impl AdminEditor {
    pub fn new(service: RateSyncService, drafts: DraftCache, auth: AdminAuth) -> Self {
        let current_period = service.default_period().clone();
        Self {
            service,
            drafts,
            auth,
            authenticated: false,
            rates: Vec::new(),
            current_period,
            message: String::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    pub fn current_period(&self) -> &Period {
        &self.current_period
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub async fn login(&mut self, password: &str) -> bool {
        if self.auth.verify_password(password) {
            self.authenticated = true;
            self.set_message("Login successful");
            self.reload().await;
        } else {
            warn!("Rejected admin login");
            self.set_message("Incorrect password");
        }
        self.authenticated
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
        self.rates.clear();
        self.set_message("Logged out");
    }

    /// Loads the latest period from the store, bootstrapping it when empty.
    /// On failure the previously held rates are kept.
    pub async fn reload(&mut self) {
        let period = self.service.get_latest_period().await;
        match self.service.bootstrap_if_empty(&period).await {
            Ok(rates) => {
                self.current_period = rates
                    .first()
                    .map_or(period, |rate| rate.period.clone());
                self.rates = rates;
            }
            Err(e) => {
                error!(error = ?e, "Error fetching rates");
                self.set_message(e.to_string());
            }
        }
    }

    pub fn update_rate(&mut self, currency: &str, new_rate: &str) {
        let Some(rate) = new_rate
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
        else {
            self.set_message("Please enter a valid number");
            return;
        };

        let period = self.current_period.clone();
        let Some(row) = self.rates.iter_mut().find(|row| row.currency == currency) else {
            self.set_message(format!("Unknown currency {currency}"));
            return;
        };
        row.rate = rate;
        row.period = period;
        self.set_message("Rate updated successfully");
    }

    /// Relabels every loaded row with `label`.
    pub fn update_period(&mut self, label: &str) {
        let Ok(period) = label.parse::<Period>() else {
            self.set_message("Please enter a period name");
            return;
        };
        for row in &mut self.rates {
            row.period = period.clone();
        }
        self.current_period = period;
        self.set_message("Period updated successfully");
    }

    /// Stages the buffer as a local draft named `name`; the buffer takes the
    /// draft's period.
    pub async fn save_draft(&mut self, name: &str) {
        let Ok(period) = name.parse::<Period>() else {
            self.set_message("Please enter a period name");
            return;
        };
        let relabelled: Vec<ExchangeRate> = self
            .rates
            .iter()
            .map(|row| ExchangeRate {
                period: period.clone(),
                ..row.clone()
            })
            .collect();

        match self.drafts.save_draft(&period, &relabelled).await {
            Ok(_) => {
                self.rates = relabelled;
                self.current_period = period.clone();
                self.set_message(format!("Period {period} saved successfully"));
            }
            Err(e) => {
                error!(error = ?e, "Error saving draft");
                self.set_message(format!("Failed to save period {period}"));
            }
        }
    }

    /// Replaces the buffer with a saved draft.
    pub async fn load_draft(&mut self, name: &str) {
        let Ok(period) = name.parse::<Period>() else {
            self.set_message("Please enter a period name");
            return;
        };
        match self.drafts.load_draft(&period).await {
            Ok(Some(draft)) => {
                self.rates = draft.rates;
                self.current_period = period.clone();
                self.set_message(format!("Period {period} loaded successfully"));
            }
            Ok(None) => self.set_message(format!("Period {period} not found")),
            Err(e) => {
                error!(error = ?e, "Error loading draft");
                self.set_message(format!("Failed to load period {period}"));
            }
        }
    }

    pub async fn list_drafts(&mut self) -> Vec<Period> {
        match self.drafts.list_drafts().await {
            Ok(drafts) => drafts,
            Err(e) => {
                error!(error = ?e, "Error listing drafts");
                self.set_message("Failed to list saved periods");
                Vec::new()
            }
        }
    }

    /// Pushes the buffer to the rate store under the current period.
    pub async fn publish(&mut self) -> bool {
        let period = self.current_period.clone();
        match self.service.upsert_snapshot(&period, &self.rates).await {
            Ok(stored) => {
                info!(%period, rows = stored.len(), "Published rates");
                self.rates = stored;
                self.set_message("Rates saved to API successfully");
                true
            }
            Err(e) => {
                error!(error = ?e, "Error saving rates");
                self.set_message("Failed to save rates to API");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateStore;
    use crate::providers::memory::MemoryRateStore;
    use crate::store::memory::MemoryCollection;
    use std::sync::Arc;

    fn period(label: &str) -> Period {
        label.parse().unwrap()
    }

    fn editor_with(store: Arc<MemoryRateStore>) -> AdminEditor {
        let service = RateSyncService::new(store, Period::default());
        let drafts = DraftCache::new(Arc::new(MemoryCollection::new()));
        AdminEditor::new(service, drafts, AdminAuth::new(Some("admin-pass".to_string()), 60))
    }

    async fn logged_in() -> (AdminEditor, Arc<MemoryRateStore>) {
        let store = Arc::new(MemoryRateStore::new());
        let mut editor = editor_with(Arc::clone(&store));
        assert!(editor.login("admin-pass").await);
        (editor, store)
    }

    #[tokio::test]
    async fn test_login_gate() {
        let mut editor = editor_with(Arc::new(MemoryRateStore::new()));
        assert!(!editor.login("admin123").await);
        assert_eq!(editor.message(), "Incorrect password");
        assert!(editor.rates().is_empty());

        assert!(editor.login("admin-pass").await);
        assert_eq!(editor.rates().len(), 6);
        assert_eq!(editor.current_period(), &period("P5"));

        editor.logout();
        assert!(!editor.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_rate_with_invalid_input_keeps_state() {
        let (mut editor, _) = logged_in().await;
        let before = editor.rates().to_vec();

        editor.update_rate("AUD", "abc");
        assert_eq!(editor.message(), "Please enter a valid number");
        assert_eq!(editor.rates(), before.as_slice());

        editor.update_rate("AUD", "-1");
        assert_eq!(editor.rates(), before.as_slice());

        // Trailing text is not read as a numeric prefix
        editor.update_rate("AUD", "0.65x");
        assert_eq!(editor.message(), "Please enter a valid number");
        assert_eq!(editor.rates(), before.as_slice());
    }

    #[tokio::test]
    async fn test_update_rate_stamps_current_period() {
        let (mut editor, _) = logged_in().await;
        editor.update_period("P6");
        editor.update_rate("AUD", "0.655");

        let aud = editor
            .rates()
            .iter()
            .find(|r| r.currency == "AUD")
            .unwrap();
        assert_eq!(aud.rate, 0.655);
        assert_eq!(aud.period, period("P6"));
        assert_eq!(editor.message(), "Rate updated successfully");
    }

    #[tokio::test]
    async fn test_update_period_relabels_all_rows() {
        let (mut editor, _) = logged_in().await;
        editor.update_period("P8");
        assert!(editor.rates().iter().all(|r| r.period == period("P8")));
        assert_eq!(editor.message(), "Period updated successfully");

        editor.update_period("  ");
        assert_eq!(editor.current_period(), &period("P8"));
    }

    #[tokio::test]
    async fn test_drafts_do_not_touch_store_until_publish() {
        let (mut editor, store) = logged_in().await;
        editor.update_rate("AUD", "0.7");
        editor.save_draft("P9").await;
        assert_eq!(editor.message(), "Period P9 saved successfully");
        assert_eq!(editor.current_period(), &period("P9"));

        assert!(store.rates_by_period(&period("P9")).await.unwrap().is_empty());

        assert!(editor.publish().await);
        let published = store.rates_by_period(&period("P9")).await.unwrap();
        assert_eq!(published.len(), 6);
        let aud = published.iter().find(|r| r.currency == "AUD").unwrap();
        assert_eq!(aud.rate, 0.7);
    }

    #[tokio::test]
    async fn test_load_draft_replaces_buffer() {
        let (mut editor, _) = logged_in().await;
        editor.update_rate("AUD", "0.1");
        editor.save_draft("P6").await;

        editor.update_rate("AUD", "0.2");
        editor.update_period("P7");
        editor.load_draft("P6").await;

        assert_eq!(editor.message(), "Period P6 loaded successfully");
        assert_eq!(editor.current_period(), &period("P6"));
        let aud = editor
            .rates()
            .iter()
            .find(|r| r.currency == "AUD")
            .unwrap();
        assert_eq!(aud.rate, 0.1);
    }

    #[tokio::test]
    async fn test_save_blank_and_load_missing_draft() {
        let (mut editor, _) = logged_in().await;
        editor.save_draft("   ").await;
        assert_eq!(editor.message(), "Please enter a period name");

        let before = editor.rates().to_vec();
        editor.load_draft("P42").await;
        assert_eq!(editor.message(), "Period P42 not found");
        assert_eq!(editor.rates(), before.as_slice());
    }

    #[tokio::test]
    async fn test_saving_same_draft_twice_lists_it_twice() {
        let (mut editor, _) = logged_in().await;
        editor.save_draft("P6").await;
        editor.save_draft("P6").await;
        assert_eq!(editor.list_drafts().await, vec![period("P6"), period("P6")]);
    }
}
