//! Boot configuration generators.
//!
//! Pure text renderers for the two bootloader dialects. Both menus encode
//! the same logical boot parameters (kernel path, initrd path, live-boot
//! mode, flavour module name) in different syntaxes; any change to boot
//! parameters must be applied to both generators, or the two bootloaders
//! diverge. Writing the rendered text to the target is the orchestrator's
//! job, which keeps these functions side-effect-free and testable.

use crate::flavour::Flavour;

/// Kernel arguments shared by both dialects.
const COMMON_BOOT_ARGS: &str = "apm=power-off lang=us boot=live nomce";

/// GRUB-legacy menu (`menu.lst` dialect).
pub fn grub_menu(flavour: &Flavour, boot_options: Option<&str>) -> String {
    let extra = extra_args(boot_options);
    format!(
        "\
# misc options:
timeout 30
splashimage=/boot/grub/splash.xpm.gz
foreground  = 000000
background  = FFCC33

# define entries:
title {flavour}  - Default boot (using 1024x768 framebuffer)
kernel /boot/release/{flavour}/linux26 {COMMON_BOOT_ARGS} vga=791 quiet module={flavour}{extra}
initrd /boot/release/{flavour}/initrd.gz
"
    )
}

/// isolinux/syslinux menu (`syslinux.cfg` dialect), including the fixed
/// function-key mapping onto the help screens.
pub fn syslinux_menu(flavour: &Flavour, boot_options: Option<&str>) -> String {
    let extra = extra_args(boot_options);
    format!(
        "\
# use this to control the bootup via a serial port
# SERIAL 0 9600
DEFAULT grml
TIMEOUT 300
PROMPT 1
DISPLAY /boot/isolinux/boot.msg
F1 /boot/isolinux/boot.msg
F2 /boot/isolinux/f2
F3 /boot/isolinux/f3
F4 /boot/isolinux/f4
F5 /boot/isolinux/f5
F6 /boot/isolinux/f6
F7 /boot/isolinux/f7
F8 /boot/isolinux/f8
F9 /boot/isolinux/f9
F10 /boot/isolinux/f10

LABEL grml
KERNEL /boot/release/{flavour}/linux26
APPEND initrd=/boot/release/{flavour}/initrd.gz {COMMON_BOOT_ARGS} module={flavour}{extra}
"
    )
}

/// Short help-screen message (`boot.msg`) shown by isolinux.
pub fn splash_message(flavour: &Flavour) -> String {
    format!(
        "\
17/boot/isolinux/logo.16

Some information and boot options available via keys F2 - F10. http://grml.org/
{flavour}
"
    )
}

fn extra_args(boot_options: Option<&str>) -> String {
    match boot_options {
        Some(opts) if !opts.is_empty() => format!(" {opts}"),
        _ => String::new(),
    }
}
