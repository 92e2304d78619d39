//! Security gate
//!
//! Stateless checks run before anything reaches the renderer or the disk:
//! - template source against a command denylist and shell/exec idioms
//! - data values stripped of shell metacharacters
//! - output paths kept out of system directories and inside an allow-list

mod content;
mod path;

pub use content::{sanitize_data, sanitize_value, validate_template_content};
pub use path::{sanitize_path, screen_output_path, validate_output_path};

/// Command names rejected when they appear as a standalone token
pub(crate) const DANGEROUS_COMMANDS: &[&str] = &[
    "rm", "del", "delete", "format", "mkfs", "dd", // destructive
    "shutdown", "reboot", "halt", "poweroff", // power
    "chmod", "chown", "chattr", // permissions
    "wget", "curl", "nc", "netcat", // network
    "bash", "sh", "zsh", "powershell", // shells
    "sudo", "su", "doas", // privilege
];

/// Regex sources for shell, exec and network idioms
pub(crate) const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?i)\b(exec|system|eval|spawn|fork)\b",
    r"(?i)\b(file|directory|path)\.(delete|remove|unlink)\b",
    r"(?i)\b(os|process)\.(exec|command|run)\b",
    r"(?i)\b(shell|bash|sh|zsh|powershell)\b",
    r"(?i)\b(sudo|su|doas)\b",
    r"(?i)\b(wget|curl|nc|netcat)\b",
];

/// Substrings removed from every data value
pub(crate) const INJECTION_SEQUENCES: &[&str] = &["`", "$(", "&&", "||", ";"];

/// Absolute path prefixes output may never land under
pub(crate) const SYSTEM_PATH_PREFIXES: &[&str] = &[
    "/etc", "/var", "/usr", "/bin", "/sbin", "/dev", "/proc", "/sys", "/root",
];
