//! User identities and capability flags.

use alloc::string::String;
use bitflags::bitflags;

bitflags! {
    /// Capabilities granted to a user by the registry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u16 {
        /// `r`: read files.
        const READ = 1 << 0;
        /// `w`: write files.
        const WRITE = 1 << 1;
        /// `x`: execute programs.
        const EXECUTE = 1 << 2;
        /// `s`: use an interactive shell.
        const USE_SHELL = 1 << 3;
        /// `a`: administrator.
        const ADMIN = 1 << 4;
        /// `m`: mount filesystems.
        const MOUNT = 1 << 5;
        /// `n`: network access.
        const NETWORK = 1 << 6;
        /// `d`: raw device access.
        const DEVICE_ACCESS = 1 << 7;
        /// `l`: read system logs.
        const LOG_ACCESS = 1 << 8;
        /// `t`: set the system clock.
        const TIME_MANAGEMENT = 1 << 9;
        /// `c`: change system configuration.
        const CONFIG_MANAGEMENT = 1 << 10;
        /// `b`: change boot parameters.
        const BOOT_PARAM_MANAGEMENT = 1 << 11;
        /// `u`: manage users.
        const USER_MANAGEMENT = 1 << 12;
    }
}

impl Capabilities {
    /// Map a single permission character to its flag.
    pub fn from_perm_char(c: char) -> Option<Self> {
        let flag = match c {
            'r' => Self::READ,
            'w' => Self::WRITE,
            'x' => Self::EXECUTE,
            's' => Self::USE_SHELL,
            'a' => Self::ADMIN,
            'm' => Self::MOUNT,
            'n' => Self::NETWORK,
            'd' => Self::DEVICE_ACCESS,
            'l' => Self::LOG_ACCESS,
            't' => Self::TIME_MANAGEMENT,
            'c' => Self::CONFIG_MANAGEMENT,
            'b' => Self::BOOT_PARAM_MANAGEMENT,
            'u' => Self::USER_MANAGEMENT,
            _ => return None,
        };
        Some(flag)
    }

    /// Collect the flags named by a permission string.
    ///
    /// Unknown characters are ignored and repeats have no extra effect.
    pub fn from_perm_str(perms: &str) -> Self {
        perms
            .chars()
            .filter_map(Self::from_perm_char)
            .fold(Self::empty(), |acc, flag| acc | flag)
    }
}

/// One parsed user identity. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    username: String,
    uid: String,
    gid: String,
    home: String,
    shell: String,
    capabilities: Capabilities,
    dir_access: String,
}

impl UserRecord {
    pub(crate) fn new(
        username: String,
        uid: String,
        gid: String,
        home: String,
        shell: String,
        capabilities: Capabilities,
        dir_access: String,
    ) -> Self {
        Self {
            username,
            uid,
            gid,
            home,
            shell,
            capabilities,
            dir_access,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn gid(&self) -> &str {
        &self.gid
    }

    /// Home directory path.
    pub fn home(&self) -> &str {
        &self.home
    }

    /// Login shell executable path.
    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Directory subtree this user may access.
    pub fn dir_access(&self) -> &str {
        &self.dir_access
    }

    /// Check whether the user holds every capability in `required`.
    pub fn has(&self, required: Capabilities) -> bool {
        self.capabilities.contains(required)
    }

    pub fn can_read(&self) -> bool {
        self.has(Capabilities::READ)
    }

    pub fn can_write(&self) -> bool {
        self.has(Capabilities::WRITE)
    }

    pub fn can_execute(&self) -> bool {
        self.has(Capabilities::EXECUTE)
    }

    pub fn is_admin(&self) -> bool {
        self.has(Capabilities::ADMIN)
    }
}
