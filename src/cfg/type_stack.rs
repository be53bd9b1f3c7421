use crate::bytecode::{InstructionEvent, Loadable, Loadable2};
use crate::classfile::descriptors::{parse_field_descriptor, parse_method_descriptor, JvmType};
use crate::errors::{Error, VerifyErrorKind};
use crate::util::Offset;

/// Simulated operand stack of [`JvmType`]s
///
/// Category 2 types (`long`, `double`) are stored as one entry; [`depth`] counts entries, not
/// JVM slots.
///
/// [`depth`]: TypeStack::depth
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TypeStack {
    entries: Vec<JvmType>,
}

impl TypeStack {
    pub fn new() -> TypeStack {
        TypeStack { entries: vec![] }
    }

    pub fn of(entries: &[JvmType]) -> TypeStack {
        TypeStack {
            entries: entries.to_vec(),
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JvmType] {
        &self.entries
    }

    pub fn push(&mut self, typ: JvmType) {
        self.entries.push(typ);
    }

    pub fn pop(&mut self) -> Result<JvmType, VerifyErrorKind> {
        self.entries.pop().ok_or(VerifyErrorKind::EmptyStack)
    }

    /// Pop a value that must have exactly the given type
    pub fn pop_expect(&mut self, expected: JvmType) -> Result<(), VerifyErrorKind> {
        let found = self.pop()?;
        if found != expected {
            return Err(VerifyErrorKind::WrongType { expected, found });
        }
        Ok(())
    }

    /// Pop a reference; a return address is also accepted (for `astore` inside subroutines)
    fn pop_reference_or_retaddr(&mut self) -> Result<JvmType, VerifyErrorKind> {
        let found = self.pop()?;
        match found {
            JvmType::Reference | JvmType::ReturnAddress => Ok(found),
            _ => Err(VerifyErrorKind::WrongType {
                expected: JvmType::Reference,
                found,
            }),
        }
    }

    fn pop_category1(&mut self) -> Result<JvmType, VerifyErrorKind> {
        let found = self.pop()?;
        if found.category() != 1 {
            return Err(VerifyErrorKind::WrongCategory(found));
        }
        Ok(found)
    }

    /// Update the stack with the effect of one instruction
    ///
    /// Jumps contribute no effect of their own here: by the time a branch is taken its operands
    /// have already been popped, so the state left behind is exactly what the target (and the
    /// fallthrough) block starts with. The return address a `jsr` pushes only exists on the
    /// subroutine path and is the block finder's business, not this function's.
    pub fn apply(&mut self, at: Offset, event: &InstructionEvent) -> Result<(), Error> {
        self.apply_kind(event)
            .map_err(|kind| Error::Verify { at, kind })
    }

    fn apply_kind(&mut self, event: &InstructionEvent) -> Result<(), VerifyErrorKind> {
        use InstructionEvent::*;
        use JvmType::*;

        match event {
            Nop | Goto(_) | Jsr(_) | Ret(_) | Return | IInc(_, _) => (),

            AConstNull | ALoad(_) => self.push(Reference),
            IConst(_) | ILoad(_) => self.push(Int),
            LConst(_) | LLoad(_) => self.push(Long),
            FConst(_) | FLoad(_) => self.push(Float),
            DConst(_) | DLoad(_) => self.push(Double),

            Ldc(loadable) => self.push(match loadable {
                Loadable::Int(_) => Int,
                Loadable::Float(_) => Float,
                Loadable::String(_) | Loadable::Class(_) => Reference,
            }),
            Ldc2(loadable) => self.push(match loadable {
                Loadable2::Long(_) => Long,
                Loadable2::Double(_) => Double,
            }),

            IALoad | BALoad | CALoad | SALoad => self.array_load(Int)?,
            LALoad => self.array_load(Long)?,
            FALoad => self.array_load(Float)?,
            DALoad => self.array_load(Double)?,
            AALoad => self.array_load(Reference)?,

            IStore(_) => self.pop_expect(Int)?,
            LStore(_) => self.pop_expect(Long)?,
            FStore(_) => self.pop_expect(Float)?,
            DStore(_) => self.pop_expect(Double)?,
            AStore(_) => {
                self.pop_reference_or_retaddr()?;
            }

            IAStore | BAStore | CAStore | SAStore => self.array_store(Int)?,
            LAStore => self.array_store(Long)?,
            FAStore => self.array_store(Float)?,
            DAStore => self.array_store(Double)?,
            AAStore => self.array_store(Reference)?,

            Pop => {
                self.pop_category1()?;
            }
            Pop2 => {
                let top = self.pop()?;
                if top.category() == 1 {
                    self.pop_category1()?;
                }
            }
            Dup => {
                let top = self.pop_category1()?;
                self.push(top);
                self.push(top);
            }
            DupX1 => {
                let v1 = self.pop_category1()?;
                let v2 = self.pop_category1()?;
                self.push(v1);
                self.push(v2);
                self.push(v1);
            }
            DupX2 => {
                let v1 = self.pop_category1()?;
                let v2 = self.pop()?;
                if v2.category() == 2 {
                    self.push(v1);
                    self.push(v2);
                    self.push(v1);
                } else {
                    let v3 = self.pop_category1()?;
                    self.push(v1);
                    self.push(v3);
                    self.push(v2);
                    self.push(v1);
                }
            }
            Dup2 => {
                let v1 = self.pop()?;
                if v1.category() == 2 {
                    self.push(v1);
                    self.push(v1);
                } else {
                    let v2 = self.pop_category1()?;
                    self.push(v2);
                    self.push(v1);
                    self.push(v2);
                    self.push(v1);
                }
            }
            Dup2X1 => {
                let v1 = self.pop()?;
                if v1.category() == 2 {
                    let v2 = self.pop_category1()?;
                    self.push(v1);
                    self.push(v2);
                    self.push(v1);
                } else {
                    let v2 = self.pop_category1()?;
                    let v3 = self.pop_category1()?;
                    self.push(v2);
                    self.push(v1);
                    self.push(v3);
                    self.push(v2);
                    self.push(v1);
                }
            }
            Dup2X2 => {
                let v1 = self.pop()?;
                if v1.category() == 2 {
                    let v2 = self.pop()?;
                    if v2.category() == 2 {
                        self.push(v1);
                        self.push(v2);
                        self.push(v1);
                    } else {
                        let v3 = self.pop_category1()?;
                        self.push(v1);
                        self.push(v3);
                        self.push(v2);
                        self.push(v1);
                    }
                } else {
                    let v2 = self.pop_category1()?;
                    let v3 = self.pop()?;
                    if v3.category() == 2 {
                        self.push(v2);
                        self.push(v1);
                        self.push(v3);
                        self.push(v2);
                        self.push(v1);
                    } else {
                        let v4 = self.pop_category1()?;
                        self.push(v2);
                        self.push(v1);
                        self.push(v4);
                        self.push(v3);
                        self.push(v2);
                        self.push(v1);
                    }
                }
            }
            Swap => {
                let v1 = self.pop_category1()?;
                let v2 = self.pop_category1()?;
                self.push(v1);
                self.push(v2);
            }

            IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor => self.binary(Int)?,
            LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor => self.binary(Long)?,
            FAdd | FSub | FMul | FDiv | FRem => self.binary(Float)?,
            DAdd | DSub | DMul | DDiv | DRem => self.binary(Double)?,

            INeg => self.unary(Int, Int)?,
            LNeg => self.unary(Long, Long)?,
            FNeg => self.unary(Float, Float)?,
            DNeg => self.unary(Double, Double)?,

            // shift amount is always an int, even for long shifts
            ISh(_) => {
                self.pop_expect(Int)?;
                self.unary(Int, Int)?;
            }
            LSh(_) => {
                self.pop_expect(Int)?;
                self.unary(Long, Long)?;
            }

            I2L => self.unary(Int, Long)?,
            I2F => self.unary(Int, Float)?,
            I2D => self.unary(Int, Double)?,
            L2I => self.unary(Long, Int)?,
            L2F => self.unary(Long, Float)?,
            L2D => self.unary(Long, Double)?,
            F2I => self.unary(Float, Int)?,
            F2L => self.unary(Float, Long)?,
            F2D => self.unary(Float, Double)?,
            D2I => self.unary(Double, Int)?,
            D2L => self.unary(Double, Long)?,
            D2F => self.unary(Double, Float)?,
            I2B | I2C | I2S => self.unary(Int, Int)?,

            LCmp => {
                self.pop_expect(Long)?;
                self.unary(Long, Int)?;
            }
            FCmp(_) => {
                self.pop_expect(Float)?;
                self.unary(Float, Int)?;
            }
            DCmp(_) => {
                self.pop_expect(Double)?;
                self.unary(Double, Int)?;
            }

            If(_, _) | TableSwitch { .. } | LookupSwitch { .. } => self.pop_expect(Int)?,
            IfICmp(_, _) => {
                self.pop_expect(Int)?;
                self.pop_expect(Int)?;
            }
            IfACmp(_, _) => {
                self.pop_expect(Reference)?;
                self.pop_expect(Reference)?;
            }
            IfNull(_, _) => self.pop_expect(Reference)?,

            IReturn => self.pop_expect(Int)?,
            LReturn => self.pop_expect(Long)?,
            FReturn => self.pop_expect(Float)?,
            DReturn => self.pop_expect(Double)?,
            AReturn | AThrow | MonitorEnter | MonitorExit => self.pop_expect(Reference)?,

            GetStatic(field) => self.push(field_type(&field.descriptor)?),
            PutStatic(field) => self.pop_expect(field_type(&field.descriptor)?)?,
            GetField(field) => {
                self.pop_expect(Reference)?;
                self.push(field_type(&field.descriptor)?);
            }
            PutField(field) => {
                self.pop_expect(field_type(&field.descriptor)?)?;
                self.pop_expect(Reference)?;
            }

            Invoke(kind, method) => {
                let (arguments, ret) = method_types(&method.descriptor)?;
                for argument in arguments.iter().rev() {
                    self.pop_expect(*argument)?;
                }
                if kind.has_receiver() {
                    self.pop_expect(Reference)?;
                }
                if let Some(ret) = ret {
                    self.push(ret);
                }
            }

            New(_) => self.push(Reference),
            NewArray(_) | ANewArray(_) => self.unary(Int, Reference)?,
            MultiANewArray(_, dimensions) => {
                for _ in 0..*dimensions {
                    self.pop_expect(Int)?;
                }
                self.push(Reference);
            }
            ArrayLength => self.unary(Reference, Int)?,
            CheckCast(_) => self.unary(Reference, Reference)?,
            InstanceOf(_) => self.unary(Reference, Int)?,
        }
        Ok(())
    }

    fn array_load(&mut self, element: JvmType) -> Result<(), VerifyErrorKind> {
        self.pop_expect(JvmType::Int)?;
        self.pop_expect(JvmType::Reference)?;
        self.push(element);
        Ok(())
    }

    fn array_store(&mut self, element: JvmType) -> Result<(), VerifyErrorKind> {
        self.pop_expect(element)?;
        self.pop_expect(JvmType::Int)?;
        self.pop_expect(JvmType::Reference)?;
        Ok(())
    }

    fn binary(&mut self, operand: JvmType) -> Result<(), VerifyErrorKind> {
        self.pop_expect(operand)?;
        self.pop_expect(operand)?;
        self.push(operand);
        Ok(())
    }

    fn unary(&mut self, from: JvmType, to: JvmType) -> Result<(), VerifyErrorKind> {
        self.pop_expect(from)?;
        self.push(to);
        Ok(())
    }
}

fn field_type(descriptor: &str) -> Result<JvmType, VerifyErrorKind> {
    parse_field_descriptor(descriptor).map_err(|_| bad_descriptor(descriptor))
}

fn method_types(descriptor: &str) -> Result<(Vec<JvmType>, Option<JvmType>), VerifyErrorKind> {
    parse_method_descriptor(descriptor).map_err(|_| bad_descriptor(descriptor))
}

fn bad_descriptor(descriptor: &str) -> VerifyErrorKind {
    VerifyErrorKind::UnusableDescriptor(descriptor.to_string())
}
