use ledgerline_protocol::{ConstraintFailure, HashRequest, TransformResult};
use ledgerline_schema::HashCheck;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

use super::ConstraintEnv;

/// Wait for the companion digest, then compare it with the digest the hash
/// function computes over the local source copy.
pub(super) fn check(
    name: &str,
    check: &HashCheck,
    env: &ConstraintEnv<'_>,
) -> TransformResult<Vec<ConstraintFailure>> {
    let store = env.collaborators.object_store.as_ref();
    let companion = check.companion.resolve(name, env.event.file_name(), None)?;

    let started = Instant::now();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if store
            .exists(&check.bucket, &companion, true)
            .map_err(|e| e.into_transform("object store"))?
        {
            break;
        }
        let elapsed = started.elapsed();
        if elapsed >= check.max_wait {
            info!(
                constraint = name,
                companion = %companion,
                polls,
                "Companion digest did not appear"
            );
            return Ok(vec![ConstraintFailure::new(
                name,
                format!(
                    "companion file s3://{}/{} not found within {}s",
                    check.bucket,
                    companion,
                    check.max_wait.as_secs_f64()
                ),
            )]);
        }
        let pause = check.wait_interval.min(check.max_wait - elapsed);
        debug!(constraint = name, companion = %companion, ?pause, "Waiting for companion digest");
        thread::sleep(pause);
    }

    let expected = store
        .download(&check.bucket, &companion)
        .map_err(|e| e.into_transform("object store"))?;
    let expected = String::from_utf8_lossy(&expected).trim().to_string();

    let request = HashRequest {
        absolute_path: env.source_path.display().to_string(),
        algorithm: check.algorithm.clone(),
        use_line_ending_conversion: check.use_line_ending_conversion,
    };
    let response = env
        .collaborators
        .hasher
        .invoke(&check.function_name, &request)
        .map_err(|e| e.into_transform("hash function"))?;
    debug!(
        constraint = name,
        function = %check.function_name,
        status = response.status_code,
        "Hash function returned"
    );

    if response.status_code != 200 {
        return Ok(vec![ConstraintFailure::new(
            name,
            format!(
                "hash function {} returned status {}",
                check.function_name, response.status_code
            ),
        )]);
    }
    if response.body.trim() != expected {
        return Ok(vec![ConstraintFailure::new(
            name,
            format!(
                "{} digest of {} does not match companion {}",
                check.algorithm,
                env.event.file_name(),
                companion
            ),
        )]);
    }
    Ok(Vec::new())
}
