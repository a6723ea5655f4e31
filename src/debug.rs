//! Validation-layer diagnostics.
//!
//! The debug messenger hands every message to a [`DiagnosticCallback`]. Without a
//! user callback, messages go to the `log` facade via [`log_message`].

use std::{
    ffi::{c_void, CStr},
    panic::{self, AssertUnwindSafe},
};

use ash::{extensions::ext::DebugUtils, vk};

use crate::error::{ContextError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn from_flags(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    pub fn log_level(self) -> log::Level {
        match self {
            Self::Verbose => log::Level::Trace,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Validation,
    Performance,
}

impl Category {
    /// Picks the most specific category when several type bits are set.
    pub fn from_flags(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            Self::Validation
        } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            Self::Performance
        } else {
            Self::General
        }
    }
}

/// Receives one diagnostic message. Returning `true` asks the driver to abort the
/// call that triggered it, which is only useful when testing the layers themselves.
pub type DiagnosticCallback = dyn Fn(Severity, Category, &str) -> bool + Send + Sync;

/// Default callback: forwards to `log` and never aborts.
pub fn log_message(severity: Severity, category: Category, message: &str) -> bool {
    log::log!(severity.log_level(), "[validation][{category:?}] {message}");
    false
}

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    let severity = Severity::from_flags(message_severity);
    let category = Category::from_flags(message_types);
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        "<no message>".into()
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };

    // Unwinding across the driver is undefined.
    let abort = panic::catch_unwind(AssertUnwindSafe(|| {
        if p_user_data.is_null() {
            log_message(severity, category, &message)
        } else {
            let callback = &*(p_user_data as *const Box<DiagnosticCallback>);
            callback(severity, category, &message)
        }
    }))
    .unwrap_or(false);

    if abort {
        vk::TRUE
    } else {
        vk::FALSE
    }
}

/// Builds the messenger description. `user_data` must point at a
/// `Box<DiagnosticCallback>` that outlives every use of the returned info, or be null.
pub fn messenger_create_info<'a>(
    user_data: *mut c_void,
) -> vk::DebugUtilsMessengerCreateInfoEXTBuilder<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
        .user_data(user_data)
}

pub struct DebugMessenger {
    pub functions: DebugUtils,
    pub handle: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        user_data: *mut c_void,
    ) -> Result<Self> {
        let functions = DebugUtils::new(entry, instance);
        let handle = unsafe {
            functions
                .create_debug_utils_messenger(&messenger_create_info(user_data), None)
                .map_err(ContextError::DiagnosticsSetupFailed)?
        };
        Ok(Self { functions, handle })
    }

    /// # Safety
    ///
    /// Must run before the owning instance is destroyed, and only once.
    pub unsafe fn destroy(&self) {
        self.functions
            .destroy_debug_utils_messenger(self.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::CString,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[test]
    fn severity_uses_highest_bit() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as F;
        assert_eq!(Severity::from_flags(F::VERBOSE), Severity::Verbose);
        assert_eq!(Severity::from_flags(F::INFO), Severity::Info);
        assert_eq!(Severity::from_flags(F::WARNING | F::INFO), Severity::Warning);
        assert_eq!(Severity::from_flags(F::ERROR | F::VERBOSE), Severity::Error);
        assert_eq!(Severity::Warning.log_level(), log::Level::Warn);
        assert_eq!(Severity::Verbose.log_level(), log::Level::Trace);
    }

    #[test]
    fn category_prefers_validation_then_performance() {
        use vk::DebugUtilsMessageTypeFlagsEXT as F;
        assert_eq!(Category::from_flags(F::GENERAL), Category::General);
        assert_eq!(Category::from_flags(F::PERFORMANCE | F::GENERAL), Category::Performance);
        assert_eq!(Category::from_flags(F::VALIDATION | F::PERFORMANCE), Category::Validation);
    }

    #[test]
    fn default_callback_never_aborts() {
        assert!(!log_message(Severity::Error, Category::Validation, "boom"));
    }

    #[test]
    fn driver_callback_forwards_to_user_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: Box<DiagnosticCallback> = Box::new(move |severity, category, message| {
            sink.lock().unwrap().push((severity, category, message.to_owned()));
            severity == Severity::Error
        });
        let callback = Box::new(callback);
        let user_data = &*callback as *const Box<DiagnosticCallback> as *mut c_void;

        let text = CString::new("object leaked").unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT::builder()
            .message(&text)
            .build();

        let warn = unsafe {
            vulkan_debug_utils_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                user_data,
            )
        };
        let error = unsafe {
            vulkan_debug_utils_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                &data,
                user_data,
            )
        };

        assert_eq!(warn, vk::FALSE);
        assert_eq!(error, vk::TRUE);
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (Severity::Warning, Category::Validation, "object leaked".to_owned())
        );
        assert_eq!(seen[1].0, Severity::Error);
    }

    #[test]
    fn panicking_callback_does_not_abort() {
        let callback: Box<DiagnosticCallback> = Box::new(|_, _, _| panic!("callback failure"));
        let callback = Box::new(callback);
        let user_data = &*callback as *const Box<DiagnosticCallback> as *mut c_void;
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();

        let result = unsafe {
            vulkan_debug_utils_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                user_data,
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
