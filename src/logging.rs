/// Standardized logging macros for consistent field names and message patterns across the crate
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, question_id = $question_id:expr) => {
        tracing::debug!(
            operation = $operation,
            question_id = %$question_id,
            "API operation started"
        );
    };
    ($operation:expr, student_id = $student_id:expr) => {
        tracing::debug!(
            operation = $operation,
            student_id = %$student_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, question_id = $question_id:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            question_id = %$question_id,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, question_id = $question_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            question_id = %$question_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, student_id = $student_id:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            student_id = %$student_id,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, student_id = $student_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            student_id = %$student_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, student_id = $student_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            student_id = %$student_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Engine Logging Macros
// ============================================================================

/// Log engine operation start with context
#[macro_export]
macro_rules! log_engine_start {
    ($engine:expr, $operation:expr, candidate_count = $count:expr) => {
        tracing::debug!(
            engine = $engine,
            operation = $operation,
            candidate_count = $count,
            "Engine operation started"
        );
    };
    ($engine:expr, $operation:expr, result_count = $count:expr) => {
        tracing::debug!(
            engine = $engine,
            operation = $operation,
            result_count = $count,
            "Engine operation started"
        );
    };
    ($engine:expr, $operation:expr) => {
        tracing::debug!(
            engine = $engine,
            operation = $operation,
            "Engine operation started"
        );
    };
}

/// Log engine operation success
#[macro_export]
macro_rules! log_engine_success {
    ($engine:expr, $operation:expr, result_count = $count:expr, duration_us = $duration:expr) => {
        tracing::debug!(
            engine = $engine,
            operation = $operation,
            result_count = $count,
            duration_us = $duration,
            "Engine operation completed"
        );
    };
    ($engine:expr, $operation:expr, $msg:expr) => {
        tracing::debug!(
            engine = $engine,
            operation = $operation,
            "Engine operation completed: {}", $msg
        );
    };
}

/// Log engine warnings (skipped input, stale references)
#[macro_export]
macro_rules! log_engine_warn {
    ($engine:expr, $operation:expr, question_id = $question_id:expr, $msg:expr) => {
        tracing::warn!(
            engine = $engine,
            operation = $operation,
            question_id = %$question_id,
            "Engine warning: {}",
            $msg
        );
    };
    ($engine:expr, $operation:expr, $msg:expr) => {
        tracing::warn!(
            engine = $engine,
            operation = $operation,
            "Engine warning: {}",
            $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Performance Logging Macros
// ============================================================================

/// Log performance metrics with consistent structure
#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_ms = $duration:expr, items = $items:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            items = $items,
            "Performance metrics"
        );
    };
    ($operation:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            "Performance metrics"
        );
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
