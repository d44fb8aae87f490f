// src/messages/names.rs

//! Well-known service message and attribute names.

pub mod set_variable {
    pub const NAME: &str = "setVariable";
    pub const NAME_ATTRIBUTE: &str = "name";
    pub const VALUE_ATTRIBUTE: &str = "value";
    pub const SENSITIVE_ATTRIBUTE: &str = "sensitive";
}

pub mod stdout {
    pub const DEFAULT: &str = "stdout-default";
    pub const ERROR: &str = "stdout-error";
    pub const IGNORE: &str = "stdout-ignore";
    pub const VERBOSE: &str = "stdout-verbose";
    pub const WARNING: &str = "stdout-warning";
    pub const HIGHLIGHT: &str = "stdout-highlight";
    pub const WAIT: &str = "stdout-wait";
}

pub mod stderr {
    pub const DEFAULT: &str = "stderr-default";
    pub const ERROR: &str = "stderr-error";
    pub const IGNORE: &str = "stderr-ignore";
    pub const PROGRESS: &str = "stderr-progress";
}

pub mod progress {
    pub const NAME: &str = "progress";
    pub const PERCENTAGE: &str = "percentage";
    pub const MESSAGE: &str = "message";
}

pub mod create_artifact {
    pub const NAME: &str = "createArtifact";
    pub const NAME_ATTRIBUTE: &str = "name";
    pub const PATH_ATTRIBUTE: &str = "path";
    pub const LENGTH_ATTRIBUTE: &str = "length";
}

pub mod result_message {
    pub const NAME: &str = "resultMessage";
    pub const MESSAGE_ATTRIBUTE: &str = "message";
}

pub mod found_package_marker {
    pub const NAME: &str = "calamari-found-package";
}

pub mod found_package {
    pub const NAME: &str = "foundPackage";
    pub const ID_ATTRIBUTE: &str = "id";
    pub const VERSION_ATTRIBUTE: &str = "version";
    pub const VERSION_FORMAT_ATTRIBUTE: &str = "versionFormat";
    pub const HASH_ATTRIBUTE: &str = "hash";
    pub const REMOTE_PATH_ATTRIBUTE: &str = "remotePath";
    pub const FILE_EXTENSION_ATTRIBUTE: &str = "fileExtension";
}

pub mod delta_verification {
    pub const NAME: &str = "deltaVerification";
    pub const REMOTE_PATH_ATTRIBUTE: &str = "remotePath";
    pub const HASH_ATTRIBUTE: &str = "hash";
    pub const SIZE_ATTRIBUTE: &str = "size";
    pub const ERROR_ATTRIBUTE: &str = "error";
}

/// Messages that create or remove accounts and deployment targets.
///
/// They carry no meaning for the agent itself; they are collected verbatim
/// into the session's action list for the orchestrator.
pub const SCRIPT_OUTPUT_ACTIONS: &[&str] = &[
    "create-tokenaccount",
    "create-userpassaccount",
    "create-awsaccount",
    "create-azureaccount",
    "create-kubernetestarget",
    "create-azurewebapptarget",
    "create-azurecloudservicetarget",
    "create-azureservicefabrictarget",
    "delete-target",
];

pub fn is_script_output_action(name: &str) -> bool {
    SCRIPT_OUTPUT_ACTIONS.contains(&name)
}
