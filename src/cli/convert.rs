use super::ui;
use crate::core::calculator::Calculator;
use crate::core::convert::format_rate;
use crate::core::rate::Period;
use crate::core::sync::RateSyncService;
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::error;

/// Parses `CCY=AMOUNT` arguments.
pub fn parse_amount_arg(arg: &str) -> Result<(String, String)> {
    let (currency, amount) = arg
        .split_once('=')
        .with_context(|| format!("Expected CURRENCY=AMOUNT, got '{arg}'"))?;
    Ok((currency.trim().to_uppercase(), amount.trim().to_string()))
}

impl Calculator {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Rate"),
            ui::header_cell("Amount"),
            ui::header_cell("USD"),
        ]);

        for rate in self.rates() {
            table.add_row(vec![
                Cell::new(&rate.currency),
                ui::number_cell(&format_rate(rate.rate)),
                ui::number_cell(self.amount(&rate.currency)),
                ui::result_cell(&self.result(&rate.currency)),
            ]);
        }

        let period = self
            .current_period()
            .map_or_else(|| "N/A".to_string(), Period::to_string);
        let mut output = format!(
            "Exchange rates: {}\n\n",
            ui::style_text(&period, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        if !self.jcb_usd().is_empty() {
            output.push_str(&format!(
                "\n\nJCB Convert: {} USD = {} HKD",
                ui::style_text(self.jcb_usd(), ui::StyleType::TotalLabel),
                ui::style_text(&self.jcb_hkd(), ui::StyleType::TotalValue)
            ));
        }
        output
    }
}

/// Loads rates (latest period unless one is given) and prints the conversions.
pub async fn run(
    service: &RateSyncService,
    period: Option<&str>,
    amounts: &[(String, String)],
    jcb_usd: Option<&str>,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching rates...");
    let fetched = match period {
        Some(label) => {
            let period: Period = label.parse()?;
            service.get_snapshot(&period).await
        }
        None => {
            let period = service.get_latest_period().await;
            service.bootstrap_if_empty(&period).await
        }
    };
    pb.finish_and_clear();

    let rates = fetched.unwrap_or_else(|e| {
        error!(error = ?e, "Error fetching rates");
        eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
        Vec::new()
    });

    let mut calculator = Calculator::new(rates);
    for (currency, amount) in amounts {
        calculator.set_amount(currency, amount);
    }
    if let Some(usd) = jcb_usd {
        calculator.set_jcb_usd(usd);
    }

    println!("{}", calculator.display_as_table());
    Ok(())
}
