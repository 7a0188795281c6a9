//! Form and quotation state for one quoting session.
//!
//! All mutation goes through the transition methods on [`QuoteSession`], which
//! keeps the `Empty -> Draft -> Generated -> Sending -> Sent | SendFailed`
//! lifecycle enforceable without any rendering layer.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cpq::builder::QuotationBuilder;
use crate::dispatch::{EmailDispatcher, TemplateParams};
use crate::domain::product::{CategoryId, ProductId};
use crate::domain::quote::{LineRequest, Quotation};
use crate::errors::{Notice, SessionError};
use crate::flows::states::{SessionEvent, SessionState};

pub const SEND_SUCCESS_MESSAGE: &str = "Quotation email sent successfully!";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub customer_name: String,
    pub customer_email: String,
    pub notes: String,
    pub rows: Vec<LineRequest>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            customer_email: String::new(),
            notes: String::new(),
            rows: vec![LineRequest::default()],
        }
    }
}

pub struct QuoteSession {
    builder: QuotationBuilder,
    currency_symbol: String,
    form: FormState,
    quotation: Option<Quotation>,
    state: SessionState,
    notice: Option<Notice>,
}

impl QuoteSession {
    pub fn new(builder: QuotationBuilder, currency_symbol: impl Into<String>) -> Self {
        Self {
            builder,
            currency_symbol: currency_symbol.into(),
            form: FormState::default(),
            quotation: None,
            state: SessionState::Empty,
            notice: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn quotation(&self) -> Option<&Quotation> {
        self.quotation.as_ref()
    }

    /// The most recent blocking notice, if it has not been dismissed.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn builder(&self) -> &QuotationBuilder {
        &self.builder
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn set_customer_name(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        let value = value.into();
        self.edit(|form| form.customer_name = value)
    }

    pub fn set_customer_email(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        let value = value.into();
        self.edit(|form| form.customer_email = value)
    }

    pub fn set_notes(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        let value = value.into();
        self.edit(|form| form.notes = value)
    }

    /// Appends a blank row and returns its index.
    pub fn add_row(&mut self) -> Result<usize, SessionError> {
        self.edit(|form| form.rows.push(LineRequest::default()))?;
        Ok(self.form.rows.len() - 1)
    }

    pub fn remove_row(&mut self, index: usize) -> Result<LineRequest, SessionError> {
        self.check_row(index)?;
        self.transition(SessionEvent::FormEdited)?;
        Ok(self.form.rows.remove(index))
    }

    /// Changing the category clears the row's product and variation.
    pub fn select_category(
        &mut self,
        index: usize,
        category: Option<CategoryId>,
    ) -> Result<(), SessionError> {
        self.edit_row(index, |row| {
            row.category = category;
            row.product_id = None;
            row.variation = None;
        })
    }

    /// Changing the product clears the row's variation.
    pub fn select_product(
        &mut self,
        index: usize,
        product_id: Option<ProductId>,
    ) -> Result<(), SessionError> {
        self.edit_row(index, |row| {
            row.product_id = product_id;
            row.variation = None;
        })
    }

    pub fn select_variation(
        &mut self,
        index: usize,
        variation: Option<String>,
    ) -> Result<(), SessionError> {
        self.edit_row(index, |row| row.variation = variation)
    }

    /// Quantities below one are clamped to one.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> Result<(), SessionError> {
        self.edit_row(index, |row| row.quantity = quantity.max(1))
    }

    /// Builds a quotation from the current form. On failure the previous
    /// quotation and state are left untouched.
    pub fn generate(&mut self) -> Result<&Quotation, SessionError> {
        self.allowed(SessionEvent::QuotationGenerated)?;

        let built = self.builder.build_quotation(
            &self.form.customer_name,
            &self.form.customer_email,
            &self.form.rows,
            &self.form.notes,
        );
        let quotation = match built {
            Ok(quotation) => quotation,
            Err(error) => {
                warn!(
                    event_name = "quotation.generation_rejected",
                    rows = self.form.rows.len(),
                    error = %error,
                    "quotation generation rejected"
                );
                return Err(self.fail(SessionError::from(error)));
            }
        };

        info!(
            event_name = "quotation.generated",
            lines = quotation.lines.len(),
            total = %quotation.formatted_total(),
            "quotation generated"
        );
        self.transition(SessionEvent::QuotationGenerated)?;
        self.notice = None;
        Ok(self.quotation.insert(quotation))
    }

    /// Dispatches the current quotation once. Success resets the session;
    /// failure keeps everything so the same quotation can be retried.
    pub async fn send<D>(&mut self, dispatcher: &D) -> Result<Notice, SessionError>
    where
        D: EmailDispatcher + ?Sized,
    {
        if self.state.is_busy() {
            return Err(self.fail(SessionError::SendInProgress));
        }
        let Some(quotation) = self.quotation.as_ref() else {
            return Err(self.fail(SessionError::NoQuotation));
        };
        let lines = quotation.lines.len();
        let params = TemplateParams::from_quotation(
            quotation,
            self.builder.catalog().kind(),
            &self.currency_symbol,
        );

        self.transition(SessionEvent::SendStarted)?;
        info!(event_name = "email.dispatch_started", lines, "sending quotation email");

        let mut in_flight = InFlightSend { session: self, settled: false };
        let outcome = dispatcher.send(&params).await;
        in_flight.settled = true;
        let session = &mut *in_flight.session;

        match outcome {
            Ok(()) => {
                session.transition(SessionEvent::SendSucceeded)?;
                info!(event_name = "email.dispatch_succeeded", "quotation email sent");
                session.reset()?;
                let notice = Notice::success(SEND_SUCCESS_MESSAGE);
                session.notice = Some(notice.clone());
                Ok(notice)
            }
            Err(error) => {
                session.transition(SessionEvent::SendFailed)?;
                warn!(
                    event_name = "email.dispatch_failed",
                    error = %error,
                    "quotation email failed"
                );
                Err(session.fail(SessionError::Dispatch(error)))
            }
        }
    }

    /// Returns every field to its initial value and drops the quotation.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.transition(SessionEvent::ResetRequested)?;
        self.form = FormState::default();
        self.quotation = None;
        self.notice = None;
        info!(event_name = "session.reset", "quotation session reset");
        Ok(())
    }

    fn edit<F>(&mut self, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut FormState),
    {
        self.transition(SessionEvent::FormEdited)?;
        apply(&mut self.form);
        Ok(())
    }

    fn edit_row<F>(&mut self, index: usize, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut LineRequest),
    {
        self.check_row(index)?;
        self.edit(|form| apply(&mut form.rows[index]))
    }

    fn check_row(&self, index: usize) -> Result<(), SessionError> {
        let len = self.form.rows.len();
        if index >= len {
            return Err(SessionError::RowOutOfRange { index, len });
        }
        Ok(())
    }

    fn allowed(&self, event: SessionEvent) -> Result<SessionState, SessionError> {
        self.state.next(event).ok_or(SessionError::InvalidTransition { from: self.state, event })
    }

    fn transition(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        self.state = self.allowed(event)?;
        Ok(())
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        self.notice = Some(error.notice());
        error
    }
}

/// Puts the session into `SendFailed` if a send future is dropped while the
/// dispatcher call is pending, so the quotation can be retried or reset.
struct InFlightSend<'a> {
    session: &'a mut QuoteSession,
    settled: bool,
}

impl Drop for InFlightSend<'_> {
    fn drop(&mut self) {
        if !self.settled && self.session.state.is_busy() {
            self.session.state = SessionState::SendFailed;
            warn!(event_name = "email.dispatch_abandoned", "quotation email send was cancelled");
        }
    }
}
