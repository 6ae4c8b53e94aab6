//! ABI prologue/epilogue synthesis: scratch register allocation, clobber
//! save/restore, stack alignment, and leaf-function-aware red-zone
//! elision.
//!
//! Grounded in the split cranelift's per-ISA `ABIMachineSpec` uses
//! internally (`gen_prologue_frame_setup`, `gen_clobber_save`,
//! `get_clobbered_callee_saves`): one `Abi` implementation per calling
//! convention family, each responsible for its own register set and
//! snippet syntax, with the allocation policy itself shared here.

use smallvec::SmallVec;

/// A target register, named the way the chosen ISA's assembler syntax
/// expects (e.g. `"rbx"`, `"x19"`).
pub type Register = &'static str;

/// A line of assembly produced by the synthesizer, to be concatenated
/// with the patch's own body.
pub type Snippet = String;

bitflags::bitflags! {
    /// A patch's ABI requirements, mirroring the `constraints` record in
    /// the specification.
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct ConstraintFlags: u8 {
        const CLOBBERS_FLAGS                   = 0b0001;
        const ALIGN_STACK                       = 0b0010;
        const PRESERVE_CALLER_SAVED_REGISTERS   = 0b0100;
        const X86_SYNTAX_INTEL                  = 0b1000;
    }
}

/// A patch's declared ABI requirements: how many scratch registers it
/// needs, which registers it clobbers explicitly, and the flag-level
/// requirements above.
#[derive(Clone, Debug, Default)]
pub struct Constraints {
    pub scratch_register_count: usize,
    pub clobbered_registers: Vec<Register>,
    pub flags: ConstraintFlags,
}

impl Constraints {
    pub fn clobbers_flags(&self) -> bool {
        self.flags.contains(ConstraintFlags::CLOBBERS_FLAGS)
    }

    pub fn align_stack(&self) -> bool {
        self.flags.contains(ConstraintFlags::ALIGN_STACK)
    }

    pub fn preserve_caller_saved_registers(&self) -> bool {
        self.flags.contains(ConstraintFlags::PRESERVE_CALLER_SAVED_REGISTERS)
    }

    /// Whether this is the empty constraints record function patches are
    /// required to carry (§4.D point 3 of the specification).
    pub fn is_empty(&self) -> bool {
        self.scratch_register_count == 0
            && self.clobbered_registers.is_empty()
            && self.flags.is_empty()
    }
}

/// The scratch registers chosen for one patch invocation, disjoint from
/// any register the patch itself must preserve and from any register the
/// ABI reserves for a fixed role.
#[derive(Clone, Debug, Default)]
pub struct RegisterAllocation {
    pub scratch: SmallVec<[Register; 4]>,
}

/// Per-calling-convention ABI policy: register classes, snippet syntax,
/// and the no-op encoding used to pad function stubs.
pub trait Abi {
    /// Registers available to this ABI for scratch allocation, in
    /// preference order; excludes the stack and frame pointer and any
    /// other fixed-role register.
    fn scratch_candidates(&self) -> &'static [Register];

    /// Every register the ABI defines as caller-saved, for the
    /// `preserve_caller_saved_registers` path.
    fn caller_saved_registers(&self) -> &'static [Register];

    /// Bytes of a single-instruction no-op in this ISA's encoding, used
    /// to pad freshly allocated function stubs before their real body is
    /// spliced in.
    fn nop(&self) -> Vec<u8>;

    /// Choose scratch registers for `constraints`, excluding any register
    /// the patch lists as clobbered (the patch already accounts for
    /// those) and any register already claimed elsewhere in the same
    /// call.
    fn allocate_patch_registers(&self, constraints: &Constraints) -> RegisterAllocation {
        let mut scratch = SmallVec::new();
        for &candidate in self.scratch_candidates() {
            if scratch.len() == constraints.scratch_register_count {
                break;
            }
            if constraints.clobbered_registers.contains(&candidate) {
                continue;
            }
            scratch.push(candidate);
        }
        assert_eq!(
            scratch.len(),
            constraints.scratch_register_count,
            "not enough scratch registers available for this ABI to satisfy the patch's request"
        );
        RegisterAllocation { scratch }
    }

    /// Build the prologue/epilogue snippet sequences and the net stack
    /// adjustment (bytes the stack pointer sits lower inside the patch
    /// body relative to its entry).
    fn create_prologue_and_epilogue(
        &self,
        constraints: &Constraints,
        registers: &RegisterAllocation,
        is_leaf: bool,
    ) -> (Vec<Snippet>, Vec<Snippet>, i64) {
        let mut prologue = Vec::new();
        let mut epilogue = Vec::new();
        let mut stack_adjustment: i64 = 0;

        let mut to_save: Vec<Register> = constraints.clobbered_registers.clone();
        for r in &registers.scratch {
            if !to_save.contains(r) {
                to_save.push(r);
            }
        }

        // Caller-saved registers beyond what's already covered above: a
        // leaf function makes no further calls, so nothing can observe
        // its red zone being clobbered, and these can be stashed there
        // instead of paying for a stack adjustment. A non-leaf function,
        // or an ABI with no red zone, falls back to push/pop like the
        // rest of `to_save`.
        let mut red_zone_saves: Vec<Register> = Vec::new();
        if constraints.preserve_caller_saved_registers() {
            let red_zone_size = self.red_zone_size();
            for &r in self.caller_saved_registers() {
                if to_save.contains(&r) {
                    continue;
                }
                let fits_in_red_zone = is_leaf
                    && (red_zone_saves.len() as i64 + 1) * self.register_width() <= red_zone_size;
                if fits_in_red_zone {
                    red_zone_saves.push(r);
                } else {
                    to_save.push(r);
                }
            }
        }

        for (i, &r) in red_zone_saves.iter().enumerate() {
            let offset = (i as i64 + 1) * self.register_width();
            prologue.push(self.save_to_red_zone_snippet(r, offset));
        }

        for &r in &to_save {
            prologue.push(self.push_register_snippet(r));
            stack_adjustment += self.register_width();
        }
        for &r in to_save.iter().rev() {
            epilogue.push(self.pop_register_snippet(r));
        }
        for (i, &r) in red_zone_saves.iter().enumerate().rev() {
            let offset = (i as i64 + 1) * self.register_width();
            epilogue.push(self.restore_from_red_zone_snippet(r, offset));
        }

        if constraints.clobbers_flags() {
            prologue.push(self.push_flags_snippet());
            stack_adjustment += self.register_width();
            epilogue.insert(0, self.pop_flags_snippet());
        }

        if constraints.align_stack() {
            let aligned = align_address(stack_adjustment, self.stack_alignment());
            let padding = aligned - stack_adjustment;
            if padding > 0 {
                prologue.push(self.adjust_stack_snippet(-padding));
                epilogue.insert(0, self.adjust_stack_snippet(padding));
                stack_adjustment += padding;
            }
        }

        (prologue, epilogue, stack_adjustment)
    }

    fn register_width(&self) -> i64;
    fn stack_alignment(&self) -> i64;
    fn push_register_snippet(&self, reg: Register) -> Snippet;
    fn pop_register_snippet(&self, reg: Register) -> Snippet;
    fn push_flags_snippet(&self) -> Snippet;
    fn pop_flags_snippet(&self) -> Snippet;
    fn adjust_stack_snippet(&self, delta: i64) -> Snippet;

    /// Bytes below the stack pointer this ABI guarantees nothing else
    /// will clobber, usable by a leaf function without adjusting the
    /// stack pointer. Zero for ABIs that don't define one.
    fn red_zone_size(&self) -> i64 {
        0
    }

    /// Store `reg` at `offset` bytes below the stack pointer, inside the
    /// red zone. Only called when `red_zone_size` is nonzero.
    fn save_to_red_zone_snippet(&self, reg: Register, offset: i64) -> Snippet {
        let _ = (reg, offset);
        unreachable!("red_zone_size is zero; no red zone to save into")
    }

    /// Reload `reg` from `offset` bytes below the stack pointer. Only
    /// called when `red_zone_size` is nonzero.
    fn restore_from_red_zone_snippet(&self, reg: Register, offset: i64) -> Snippet {
        let _ = (reg, offset);
        unreachable!("red_zone_size is zero; no red zone to restore from")
    }
}

/// Round `address` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two, as it always is for stack
/// alignment (16 bytes on every ABI this crate targets).
pub fn align_address(address: i64, alignment: i64) -> i64 {
    debug_assert!(alignment > 0 && (alignment & (alignment - 1)) == 0);
    (address + alignment - 1) & !(alignment - 1)
}

/// System V AMD64 calling convention.
pub struct SystemV;

const SYSV_SCRATCH: &[Register] = &["r10", "r11", "rax", "rcx", "rdx", "rsi", "rdi"];
const SYSV_CALLER_SAVED: &[Register] =
    &["rax", "rcx", "rdx", "rsi", "rdi", "r8", "r9", "r10", "r11"];

impl Abi for SystemV {
    fn scratch_candidates(&self) -> &'static [Register] {
        SYSV_SCRATCH
    }

    fn caller_saved_registers(&self) -> &'static [Register] {
        SYSV_CALLER_SAVED
    }

    fn nop(&self) -> Vec<u8> {
        vec![0x90]
    }

    fn register_width(&self) -> i64 {
        8
    }

    fn stack_alignment(&self) -> i64 {
        16
    }

    fn push_register_snippet(&self, reg: Register) -> Snippet {
        format!("push %{reg}")
    }

    fn pop_register_snippet(&self, reg: Register) -> Snippet {
        format!("pop %{reg}")
    }

    fn push_flags_snippet(&self) -> Snippet {
        "pushfq".to_string()
    }

    fn pop_flags_snippet(&self) -> Snippet {
        "popfq".to_string()
    }

    fn adjust_stack_snippet(&self, delta: i64) -> Snippet {
        if delta >= 0 {
            format!("sub ${delta}, %rsp")
        } else {
            format!("add ${}, %rsp", -delta)
        }
    }

    fn red_zone_size(&self) -> i64 {
        128
    }

    fn save_to_red_zone_snippet(&self, reg: Register, offset: i64) -> Snippet {
        format!("mov %{reg}, -{offset}(%rsp)")
    }

    fn restore_from_red_zone_snippet(&self, reg: Register, offset: i64) -> Snippet {
        format!("mov -{offset}(%rsp), %{reg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_address_rounds_up_to_power_of_two() {
        assert_eq!(align_address(0, 16), 0);
        assert_eq!(align_address(1, 16), 16);
        assert_eq!(align_address(16, 16), 16);
        assert_eq!(align_address(17, 16), 32);
    }

    #[test]
    fn allocation_excludes_clobbered_registers() {
        let abi = SystemV;
        let constraints = Constraints {
            scratch_register_count: 1,
            clobbered_registers: vec!["r10"],
            flags: ConstraintFlags::empty(),
        };
        let allocation = abi.allocate_patch_registers(&constraints);
        assert_eq!(allocation.scratch.as_slice(), &["r11"]);
    }

    #[test]
    fn prologue_saves_scratch_and_clobbered_in_order_epilogue_reverses() {
        let abi = SystemV;
        let constraints = Constraints {
            scratch_register_count: 1,
            clobbered_registers: vec!["rbx"],
            flags: ConstraintFlags::empty(),
        };
        let allocation = abi.allocate_patch_registers(&constraints);
        let (prologue, epilogue, adj) =
            abi.create_prologue_and_epilogue(&constraints, &allocation, true);
        assert_eq!(prologue, vec!["push %rbx", "push %r10"]);
        assert_eq!(epilogue, vec!["pop %r10", "pop %rbx"]);
        assert_eq!(adj, 16);
    }

    #[test]
    fn leaf_function_stashes_caller_saved_registers_in_the_red_zone() {
        let abi = SystemV;
        let constraints = Constraints {
            scratch_register_count: 0,
            clobbered_registers: vec![],
            flags: ConstraintFlags::PRESERVE_CALLER_SAVED_REGISTERS,
        };
        let allocation = RegisterAllocation::default();
        let (prologue, epilogue, adj) =
            abi.create_prologue_and_epilogue(&constraints, &allocation, true);
        assert!(prologue.iter().all(|s| s.starts_with("mov %")));
        assert!(epilogue.iter().all(|s| s.starts_with("mov -")));
        assert_eq!(prologue.len(), SYSV_CALLER_SAVED.len());
        assert_eq!(adj, 0, "red-zone stashes must not touch the stack pointer");
    }

    #[test]
    fn non_leaf_function_falls_back_to_push_pop_for_caller_saved_registers() {
        let abi = SystemV;
        let constraints = Constraints {
            scratch_register_count: 0,
            clobbered_registers: vec![],
            flags: ConstraintFlags::PRESERVE_CALLER_SAVED_REGISTERS,
        };
        let allocation = RegisterAllocation::default();
        let (prologue, epilogue, adj) =
            abi.create_prologue_and_epilogue(&constraints, &allocation, false);
        assert!(prologue.iter().all(|s| s.starts_with("push %")));
        assert!(epilogue.iter().all(|s| s.starts_with("pop %")));
        assert_eq!(adj, SYSV_CALLER_SAVED.len() as i64 * abi.register_width());
    }
}
