//! Validation runner.
//!
//! Every predicate is started before any result is awaited; results are
//! gathered in declaration order, so the error sequence never depends on
//! which predicate finished first.

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture, join_all};
use tracing::{trace, warn};

use formkit_model::{ErrorDescriptor, Failure, RuleArg, Value, is_empty};

use crate::context::RuleContext;
use crate::parser::ParsedRule;

/// Bookkeeping for one started predicate.
struct Call {
    name: String,
    args: Vec<RuleArg>,
    bail: bool,
}

/// Run `rules` against the value in `context`.
///
/// The returned future resolves to the failing rules' descriptors in
/// declaration order. Predicate faults are recorded as
/// [`Failure::Faulted`] descriptors; the future itself never fails.
pub fn run(
    rules: &[ParsedRule],
    context: &RuleContext,
) -> LocalBoxFuture<'static, Vec<ErrorDescriptor>> {
    if is_empty(&context.value) && rules.iter().any(ParsedRule::is_optional) {
        trace!(field = %context.name, "optional field is empty, skipping rules");
        return future::ready(Vec::new()).boxed_local();
    }

    let (calls, pending): (Vec<_>, Vec<_>) = rules
        .iter()
        .filter(|rule| !rule.is_optional())
        .map(|rule| {
            let call = Call {
                name: rule.name.clone(),
                args: rule.args.clone(),
                bail: rule.bail,
            };
            (call, rule.predicate.call(context.clone(), rule.args.clone()))
        })
        .unzip();

    let value = context.value.clone();
    let label = if context.label.is_empty() {
        context.name.clone()
    } else {
        context.label.clone()
    };
    let field = context.name.clone();

    async move {
        let outcomes = join_all(pending).await;
        let errors = gather(calls, outcomes, &value, &label);
        trace!(field = %field, failures = errors.len(), "validation run finished");
        errors
    }
    .boxed_local()
}

/// Validate a bare value with no sibling fields.
pub async fn validate_value(rules: &[ParsedRule], value: Value) -> Vec<ErrorDescriptor> {
    run(rules, &RuleContext::detached(value)).await
}

fn gather(
    calls: Vec<Call>,
    outcomes: Vec<anyhow::Result<bool>>,
    value: &Value,
    label: &str,
) -> Vec<ErrorDescriptor> {
    let mut errors = Vec::new();
    for (call, outcome) in calls.into_iter().zip(outcomes) {
        let failure = match outcome {
            Ok(true) => continue,
            Ok(false) => Failure::Rejected,
            Err(err) => {
                warn!(rule = %call.name, error = %err, "validation rule faulted");
                Failure::Faulted {
                    message: format!("{err:#}"),
                }
            }
        };
        errors.push(ErrorDescriptor {
            rule_name: call.name,
            field_value: value.clone(),
            args: call.args,
            field_label: label.to_string(),
            failure,
        });
        if call.bail {
            break;
        }
    }
    errors
}
