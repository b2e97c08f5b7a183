pub mod cputype {

    pub const CPU_ARCH_MASK: u32 = 0xff00_0000;
    pub const CPU_ARCH_ABI64: u32 = 0x0100_0000;
    pub const CPU_ARCH_ABI64_32: u32 = 0x0200_0000;
    pub const CPU_TYPE_X86: u32 = 7;
    pub const CPU_TYPE_ARM: u32 = 12;
    pub const CPU_TYPE_POWERPC: u32 = 18;
    pub const CPU_TYPE_X86_64: u32 = CPU_TYPE_X86 | CPU_ARCH_ABI64;
    pub const CPU_TYPE_ARM64: u32 = CPU_TYPE_ARM | CPU_ARCH_ABI64;
    pub const CPU_TYPE_ARM64_32: u32 = CPU_TYPE_ARM | CPU_ARCH_ABI64_32;
    pub const CPU_TYPE_POWERPC64: u32 = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

    #[inline(always)]
    pub fn cpu_type_to_str(cputype: u32) -> &'static str {
        match cputype {
            CPU_TYPE_ARM64 => "ARM64",
            CPU_TYPE_ARM64_32 => "ARM64_32",
            CPU_TYPE_X86_64 => "x86-64",
            CPU_TYPE_POWERPC64 => "PowerPC64",
            CPU_TYPE_ARM => "ARM",
            CPU_TYPE_X86 => "x86",
            CPU_TYPE_POWERPC => "PowerPC",
            _ => "UNIMPLEMENTED CPUTYPE",
        }
    }
}
