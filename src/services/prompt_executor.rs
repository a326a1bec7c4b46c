use ethers::types::{Address, U256};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    constants::EXAMPLE_PROMPTS,
    error::{AppError, Result},
    models::{ActivityKind, ActivityRecord},
    services::{
        chain_gateway::{recent_history, TxSubmission},
        conditional_swap::PendingWatch,
        intent_resolver::{self, Comparator, Intent},
        session::{SessionHandle, SessionManager},
        swap_builder::prepare_swap,
        transaction_history::render_history,
    },
};

/// Result of one executed prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PromptOutcome {
    pub intent: Intent,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ActivityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<PendingWatch>,
}

impl PromptOutcome {
    fn recorded(intent: Intent, message: String, record: ActivityRecord) -> Self {
        Self {
            intent,
            message,
            record: Some(record),
            watch: None,
        }
    }
}

fn intent_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::Transfer { .. } => "transfer",
        Intent::Swap { .. } => "swap",
        Intent::ConditionalSwap { .. } => "conditional_swap",
        Intent::BalanceQuery => "balance_query",
        Intent::HistoryQuery => "history_query",
        Intent::Unrecognized => "unrecognized",
    }
}

fn unrecognized_prompt_error() -> AppError {
    AppError::InvalidInput(format!(
        "Could not understand the prompt. Try: {}",
        EXAMPLE_PROMPTS.join(" | ")
    ))
}

/// Resolves prompts and dispatches the resulting intent against the session.
pub struct PromptExecutor {
    sessions: Arc<SessionManager>,
}

impl PromptExecutor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    pub async fn execute(&self, prompt: &str) -> Result<PromptOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidInput("Please enter a prompt".to_string()));
        }

        let intent = intent_resolver::resolve(prompt);
        tracing::info!("Prompt resolved to {}", intent_label(&intent));

        if intent == Intent::Unrecognized {
            return Err(unrecognized_prompt_error());
        }
        let session = self.sessions.require().await?;

        match intent.clone() {
            Intent::BalanceQuery => self.balance_query(intent, &session).await,
            Intent::HistoryQuery => self.history_query(intent, &session).await,
            Intent::Transfer { amount, to_address } => {
                self.transfer(intent, &session, &amount, &to_address).await
            }
            Intent::Swap { amount_in } => self.swap(intent, &session, &amount_in).await,
            Intent::ConditionalSwap {
                amount_in,
                target_price,
                comparator,
            } => {
                self.conditional_swap(intent, &session, &amount_in, target_price, comparator)
                    .await
            }
            Intent::Unrecognized => Err(unrecognized_prompt_error()),
        }
    }

    async fn balance_query(&self, intent: Intent, session: &SessionHandle) -> Result<PromptOutcome> {
        let balances = session.balances(self.sessions.contracts().usdc).await?;
        let message = balances.render();
        let record = ActivityRecord::info("Balance Query", message.clone());
        self.sessions.activity().append(record.clone()).await;
        Ok(PromptOutcome::recorded(intent, message, record))
    }

    async fn history_query(&self, intent: Intent, session: &SessionHandle) -> Result<PromptOutcome> {
        let entries = recent_history(session.gateway.as_ref(), session.address).await?;
        let message = render_history(&entries);
        let record = ActivityRecord::info("Transaction History", message.clone());
        self.sessions.activity().append(record.clone()).await;
        Ok(PromptOutcome::recorded(intent, message, record))
    }

    async fn transfer(
        &self,
        intent: Intent,
        session: &SessionHandle,
        amount: &str,
        to_address: &str,
    ) -> Result<PromptOutcome> {
        let value = self.sessions.native_amount(amount)?;
        let to = Address::from_str(to_address)
            .map_err(|_| AppError::InvalidInput(format!("Invalid address {}", to_address)))?;

        let tx = TxSubmission {
            to,
            value,
            data: None,
            gas_limit: U256::from(self.sessions.config().transfer_gas_limit),
        };
        let description = format!("Transfer {} AVAX to {}", amount, to_address);
        self.submit(intent, session, ActivityKind::Transfer, description, tx)
            .await
    }

    async fn swap(&self, intent: Intent, session: &SessionHandle, amount_in: &str) -> Result<PromptOutcome> {
        let value = self.sessions.native_amount(amount_in)?;
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        let tx = prepare_swap(
            session.gateway.as_ref(),
            &self.sessions.swap_route(),
            value,
            session.address,
            now,
        )
        .await;
        let description = format!("Swap {} AVAX for USDC", amount_in);
        self.submit(intent, session, ActivityKind::Swap, description, tx)
            .await
    }

    // Failures are recorded before being returned to the caller.
    async fn submit(
        &self,
        intent: Intent,
        session: &SessionHandle,
        kind: ActivityKind,
        description: String,
        tx: TxSubmission,
    ) -> Result<PromptOutcome> {
        match session.gateway.submit_and_confirm(tx).await {
            Ok(submitted) if submitted.confirmed => {
                tracing::info!("{} confirmed: {}", description, submitted.hash);
                let record = ActivityRecord::success(kind, description.clone(), &submitted.hash);
                self.sessions.activity().append(record.clone()).await;
                Ok(PromptOutcome::recorded(intent, description, record))
            }
            Ok(submitted) => {
                let error = format!("Transaction {} reverted", submitted.hash);
                tracing::warn!("{} failed: {}", description, error);
                let record = ActivityRecord::failure(kind, description, error.clone())
                    .with_hash(submitted.hash);
                self.sessions.activity().append(record).await;
                Err(AppError::Submission(error))
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", description, e);
                self.sessions
                    .activity()
                    .append(ActivityRecord::failure(kind, description, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn conditional_swap(
        &self,
        intent: Intent,
        session: &SessionHandle,
        amount_in: &str,
        target_price: f64,
        comparator: Comparator,
    ) -> Result<PromptOutcome> {
        let watch = self
            .sessions
            .monitor()
            .arm(session, amount_in, target_price, comparator)
            .await?;

        let message = format!(
            "Will swap {} AVAX for USDC when AVAX is {} ${}",
            amount_in,
            comparator.as_str(),
            target_price
        );
        let record = ActivityRecord::info("Conditional Swap Set", message.clone());
        self.sessions.activity().append(record.clone()).await;
        Ok(PromptOutcome {
            intent,
            message,
            record: Some(record),
            watch: Some(watch),
        })
    }
}
