//! State behind the public conversion view.
use crate::core::convert;
use crate::core::rate::{ExchangeRate, Period};
use std::collections::HashMap;

const HKD: &str = "HKD";

/// Holds the loaded rates and whatever the user typed per currency.
#[derive(Debug, Default, Clone)]
pub struct Calculator {
    rates: Vec<ExchangeRate>,
    amounts: HashMap<String, String>,
    jcb_usd: String,
}

impl Calculator {
    pub fn new(rates: Vec<ExchangeRate>) -> Self {
        Self {
            rates,
            ..Self::default()
        }
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    /// Period shown in the header: the label of the first loaded row.
    pub fn current_period(&self) -> Option<&Period> {
        self.rates.first().map(|rate| &rate.period)
    }

    pub fn set_amount(&mut self, currency: &str, amount: &str) {
        self.amounts
            .insert(currency.to_string(), amount.to_string());
    }

    pub fn amount(&self, currency: &str) -> &str {
        self.amounts.get(currency).map_or("", String::as_str)
    }

    /// USD value of the amount entered for `currency`.
    pub fn result(&self, currency: &str) -> String {
        match self.rates.iter().find(|rate| rate.currency == currency) {
            Some(rate) => convert::convert(self.amount(currency), rate.rate),
            None => convert::ZERO_DISPLAY.to_string(),
        }
    }

    pub fn set_jcb_usd(&mut self, amount: &str) {
        self.jcb_usd = amount.to_string();
    }

    pub fn jcb_usd(&self) -> &str {
        &self.jcb_usd
    }

    pub fn jcb_hkd(&self) -> String {
        let hkd_rate = self
            .rates
            .iter()
            .find(|rate| rate.currency == HKD)
            .map(|rate| rate.rate);
        convert::jcb_hkd(&self.jcb_usd, hkd_rate)
    }
}
