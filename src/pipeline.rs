//! End-to-end generation: document in, schema out.
//!
//! [`generate`] runs every stage on the calling thread. [`spawn`] runs the
//! same pipeline on a background thread and hands back a [`Pending`] that
//! yields exactly one result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::applier::{apply_patches, check_schema, merge_override, to_pretty};
use crate::assembler::{assemble, PatchOperation};
use crate::error::AnnotateError;
use crate::generator::{InferredSchema, SchemaGenerator};
use crate::node::Document;
use crate::types::GenerateOptions;
use crate::walker::Annotations;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    /// The final schema, with overrides merged.
    pub schema: Value,
    /// The patch set that turned the baseline into `schema` (before overrides).
    pub operations: Vec<PatchOperation>,
}

impl Generated {
    /// Pretty-printed schema.
    pub fn render(&self) -> Result<String, AnnotateError> {
        to_pretty(&self.schema)
    }

    /// Pretty-printed RFC 6902 patch set.
    pub fn render_patch(&self) -> Result<String, AnnotateError> {
        let encoded = serde_json::to_value(&self.operations)
            .map_err(|source| AnnotateError::InvalidJson { source })?;
        to_pretty(&encoded)
    }
}

/// Generate the schema for an annotated document using the inferred
/// baseline, returning the pretty-printed output.
///
/// # Example
///
/// ```
/// use values_schema::{generate, GenerateOptions};
///
/// let source = "name: foo # @jsonSchema: {\"minLength\": 1, \"required\": true}\n";
/// let output = generate(source, &GenerateOptions::new()).unwrap();
/// assert!(output.contains("\"minLength\": 1"));
/// ```
///
/// # Errors
///
/// Returns the first failing stage's error. Annotation errors are reported
/// together as `AnnotateError::Annotations`.
pub fn generate(source: &str, options: &GenerateOptions) -> Result<String, AnnotateError> {
    generate_with(source, &InferredSchema::default(), options)?.render()
}

/// Run the pipeline with a caller-supplied baseline generator.
pub fn generate_with(
    source: &str,
    generator: &dyn SchemaGenerator,
    options: &GenerateOptions,
) -> Result<Generated, AnnotateError> {
    let doc = Document::parse(source)?;
    let annotations = Annotations::collect(&doc.root).into_result()?;

    let baseline = generator.generate(&doc.data)?;
    let operations = assemble(&baseline, &annotations, options)?;
    let mut schema = apply_patches(&baseline, &operations)?;
    debug!(operations = operations.len(), "patches applied");

    if let Some(override_doc) = &options.override_doc {
        merge_override(&mut schema, override_doc)?;
        debug!("override merged");
    }
    if options.check {
        check_schema(&schema)?;
    }

    info!(
        annotations = annotations.patches.len(),
        required = annotations.required.entries().len(),
        "schema generated"
    );
    Ok(Generated { schema, operations })
}

/// Assemble the patch set for a document without applying it.
pub fn patch_set(source: &str, options: &GenerateOptions) -> Result<Vec<PatchOperation>, AnnotateError> {
    let doc = Document::parse(source)?;
    let annotations = Annotations::collect(&doc.root).into_result()?;
    let baseline = InferredSchema::default().generate(&doc.data)?;
    assemble(&baseline, &annotations, options)
}

/// A generation running on a background thread.
#[derive(Debug)]
pub struct Pending {
    receiver: Receiver<Result<Generated, AnnotateError>>,
}

impl Pending {
    /// Block until the task finishes.
    pub fn wait(self) -> Result<Generated, AnnotateError> {
        self.receiver.recv().unwrap_or_else(|_| Err(disconnected()))
    }

    /// Block for at most `timeout`. The task is not cancelled on expiry.
    ///
    /// # Errors
    ///
    /// Returns `AnnotateError::TimedOut` if no result arrives in time.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Generated, AnnotateError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(AnnotateError::TimedOut { timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }
}

/// Run [`generate_with`] with the inferred baseline on a background thread.
pub fn spawn(source: String, options: GenerateOptions) -> Pending {
    spawn_with(source, InferredSchema::default(), options)
}

/// Run [`generate_with`] on a background thread.
///
/// A panic inside the pipeline is caught and delivered as
/// `AnnotateError::TaskFailed`.
pub fn spawn_with<G>(source: String, generator: G, options: GenerateOptions) -> Pending
where
    G: SchemaGenerator + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    let task_sender = sender.clone();

    let spawned = thread::Builder::new()
        .name("values-schema".to_string())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                generate_with(&source, &generator, &options)
            }))
            .unwrap_or_else(|payload| {
                Err(AnnotateError::TaskFailed {
                    message: panic_message(payload.as_ref()),
                })
            });
            // The receiver may already be gone after a timeout.
            let _ = task_sender.send(outcome);
        });

    if let Err(err) = spawned {
        let _ = sender.send(Err(AnnotateError::TaskFailed {
            message: format!("cannot start worker thread: {err}"),
        }));
    }
    Pending { receiver }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn disconnected() -> AnnotateError {
    AnnotateError::TaskFailed {
        message: "worker exited without a result".to_string(),
    }
}
