//! The fixed text served by `/help`.

/// Plain ASCII summary of the virtual filesystem, served verbatim by the
/// help producer. Kept short and line-wrapped for a plain-text terminal
/// client.
pub const HELP_BANNER: &str = "\
Available paths:
  /help               this text
  /listdev            list devices (name, mode, offset, length, type)
  /temp               board temperature, octet mode only
  /dev/NAME[.OFF.LEN] read or write a device by name
  /fpga.OFF[.LEN]     raw FPGA word access
  /cpu.ADDR[.LEN]     raw CPU byte access, read only
OFF and LEN are hexadecimal word counts/offsets.
";
