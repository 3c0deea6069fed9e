//! Bill extraction
//!
//! Sends invoice and receipt page images, together with a screenshot of the
//! accounting system's bill form, to the model and asks for the form's field
//! values as JSON.

use crate::models::{ContentPart, ImagePayload};
use crate::providers::CompletionBackend;
use crate::services::catalog::ModelCatalog;
use crate::services::session::{ConversationSession, Outcome};
use crate::utils::error::SessionResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Expense categories offered by the accounting system
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Advertising",
    "Bank Charges",
    "Business Licenses and Permits",
    "Contract Labor",
    "Depreciation Expense",
    "Dues and Subscriptions",
    "Employee Benefits",
    "Insurance",
    "Interest Expense",
    "Legal and Professional Fees",
    "Meals and Entertainment",
    "Office Supplies",
    "Payroll Expenses",
    "Postage and Delivery",
    "Rent or Lease Payments",
    "Repairs and Maintenance",
    "Software and Subscriptions",
    "Taxes",
    "Travel Expenses",
    "Utilities",
    "Other",
];

/// Reply used when the model returns nothing
pub const NO_BILL_DETAILS: &str = "No bill details found.";

const BOOKKEEPER_PROMPT: &str = "You are a financial bookkeeper who posts bills to an online accounting \
system. You are given a screenshot of the bill payment form and one bill to post. The bill is either \
an invoice or a receipt, or both.";

const INSTRUCTIONS: &str = "Please fill out the bill payment form with the data from the following \
files. Please respond with a list of fields from the bill payment form, and the values from the \
invoices and receipts that should be used to populate the form. A bill is either only an invoice, \
or only a receipt, or both. This request is for one bill.";

const SCOPE_POLICY: &str = "You only analyze invoices and receipts to post bills to the online \
accounting system through the bill payment form. If you are requested to do something else, please \
refuse.";

const FORMAT_POLICY: &str = "Please provide the field names and values in a JSON format. The field \
names should be the keys, and the values should be the values. If a field is not applicable, please \
indicate that. Only JSON should be returned.";

const FORM_INTRO: &str = "Here is a screenshot of the bill payment form from the online accounting \
system for reference. It displays all of the fields and labels that need to be filled out.";

/// Extracts bill form values from document images
pub struct BillExtractor {
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<ModelCatalog>,
    model_id: String,
    form_image: Option<ImagePayload>,
    timeout: Duration,
}

impl BillExtractor {
    pub fn new(backend: Arc<dyn CompletionBackend>, model_id: impl Into<String>) -> Self {
        Self {
            backend,
            catalog: Arc::new(ModelCatalog::builtin()),
            model_id: model_id.into(),
            form_image: None,
            timeout: crate::services::session::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<ModelCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Screenshot of the bill payment form sent with every request
    pub fn with_form_image(mut self, image: ImagePayload) -> Self {
        self.form_image = Some(image);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn has_form_image(&self) -> bool {
        self.form_image.is_some()
    }

    /// User content for one bill
    pub fn build_parts(&self, invoice: &[ImagePayload], receipt: &[ImagePayload]) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::text(INSTRUCTIONS)];

        for (label, images) in [("invoice", invoice), ("receipt", receipt)] {
            if images.is_empty() {
                continue;
            }
            parts.push(ContentPart::text(format!(
                "Here are the {label} images. All of the images represent each page of one {label}."
            )));
            parts.extend(images.iter().cloned().map(ContentPart::image));
        }

        if let Some(form) = &self.form_image {
            parts.push(ContentPart::text(FORM_INTRO));
            parts.push(ContentPart::image(form.clone()));
        }

        parts.push(ContentPart::text(format!(
            "Here are the expense categories: {}",
            EXPENSE_CATEGORIES.join(", ")
        )));
        parts
    }

    /// Ask the model for the bill form values
    pub async fn extract(&self, invoice: &[ImagePayload], receipt: &[ImagePayload]) -> SessionResult<String> {
        info!(
            invoice_pages = invoice.len(),
            receipt_pages = receipt.len(),
            "Extracting bill details"
        );

        let session = ConversationSession::builder(self.backend.clone(), self.model_id.clone())
            .catalog(self.catalog.clone())
            .system_prompt(BOOKKEEPER_PROMPT)
            .policy(SCOPE_POLICY)
            .policy(FORMAT_POLICY)
            .timeout(self.timeout)
            .build()?;

        let reply = session.submit_parts(self.build_parts(invoice, receipt)).await?;
        match reply.outcome {
            Outcome::Refused(reason) => Ok(reason),
            Outcome::Text(text) => {
                let details = strip_code_fences(&text);
                debug!(length = details.len(), "Bill details received");
                if details.is_empty() {
                    Ok(NO_BILL_DETAILS.to_string())
                } else {
                    Ok(details)
                }
            }
        }
    }
}

/// Remove Markdown code fences around a JSON reply
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
