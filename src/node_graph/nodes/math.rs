use super::*;

/// One input of a utility node. With nothing connected, the port reads the
/// parameter of the same name, falling back to `default`.
#[derive(Clone, Copy, Debug)]
pub struct InputSpec {
    pub port: &'static str,
    pub default: f64,
}

const fn input(port: &'static str, default: f64) -> InputSpec {
    InputSpec { port, default }
}

const X: &[InputSpec] = &[input("x", 0.0)];
const AB_ZERO: &[InputSpec] = &[input("a", 0.0), input("b", 0.0)];
const AB_ONE: &[InputSpec] = &[input("a", 1.0), input("b", 1.0)];
const CLAMP: &[InputSpec] = &[input("x", 0.0), input("min", 0.0), input("max", 1.0)];
const MIX: &[InputSpec] = &[input("a", 0.0), input("b", 1.0), input("t", 0.5)];
const STEP: &[InputSpec] = &[input("edge", 0.5), input("x", 0.0)];
const SMOOTHSTEP: &[InputSpec] = &[input("edge0", 0.0), input("edge1", 1.0), input("x", 0.0)];
const ATAN2: &[InputSpec] = &[input("y", 0.0), input("x", 1.0)];
const REMAP: &[InputSpec] = &[
    input("x", 0.0),
    input("inMin", 0.0),
    input("inMax", 1.0),
    input("outMin", 0.0),
    input("outMax", 1.0),
];
const MASKED_COMPOSITE: &[InputSpec] = &[input("base", 0.0), input("overlay", 1.0), input("mask", 0.0)];

/// Pure arithmetic and trigonometric nodes that live preview evaluates in-line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Fract,
    Modulo,
    Min,
    Max,
    Clamp,
    Clamp01,
    Mix,
    Step,
    Smoothstep,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Log,
    Exp,
    Remap,
    Sign,
    Reciprocal,
    OneMinus,
    Negate,
    MaskedComposite,
}

impl MathOp {
    pub const ALL: [MathOp; 33] = [
        MathOp::Add,
        MathOp::Subtract,
        MathOp::Multiply,
        MathOp::Divide,
        MathOp::Power,
        MathOp::Sqrt,
        MathOp::Abs,
        MathOp::Floor,
        MathOp::Ceil,
        MathOp::Fract,
        MathOp::Modulo,
        MathOp::Min,
        MathOp::Max,
        MathOp::Clamp,
        MathOp::Clamp01,
        MathOp::Mix,
        MathOp::Step,
        MathOp::Smoothstep,
        MathOp::Sin,
        MathOp::Cos,
        MathOp::Tan,
        MathOp::Asin,
        MathOp::Acos,
        MathOp::Atan,
        MathOp::Atan2,
        MathOp::Log,
        MathOp::Exp,
        MathOp::Remap,
        MathOp::Sign,
        MathOp::Reciprocal,
        MathOp::OneMinus,
        MathOp::Negate,
        MathOp::MaskedComposite,
    ];

    pub fn type_id(self) -> &'static str {
        match self {
            MathOp::Add => "add",
            MathOp::Subtract => "subtract",
            MathOp::Multiply => "multiply",
            MathOp::Divide => "divide",
            MathOp::Power => "power",
            MathOp::Sqrt => "sqrt",
            MathOp::Abs => "abs",
            MathOp::Floor => "floor",
            MathOp::Ceil => "ceil",
            MathOp::Fract => "fract",
            MathOp::Modulo => "modulo",
            MathOp::Min => "min",
            MathOp::Max => "max",
            MathOp::Clamp => "clamp",
            MathOp::Clamp01 => "clamp01",
            MathOp::Mix => "mix",
            MathOp::Step => "step",
            MathOp::Smoothstep => "smoothstep",
            MathOp::Sin => "sin",
            MathOp::Cos => "cos",
            MathOp::Tan => "tan",
            MathOp::Asin => "asin",
            MathOp::Acos => "acos",
            MathOp::Atan => "atan",
            MathOp::Atan2 => "atan2",
            MathOp::Log => "log",
            MathOp::Exp => "exp",
            MathOp::Remap => "remap",
            MathOp::Sign => "sign",
            MathOp::Reciprocal => "reciprocal",
            MathOp::OneMinus => "one-minus",
            MathOp::Negate => "negate",
            MathOp::MaskedComposite => "masked-composite",
        }
    }

    pub fn from_type_id(type_id: &str) -> Option<MathOp> {
        MathOp::ALL.into_iter().find(|op| op.type_id() == type_id)
    }

    fn display_name(self) -> &'static str {
        match self {
            MathOp::Add => "Add",
            MathOp::Subtract => "Subtract",
            MathOp::Multiply => "Multiply",
            MathOp::Divide => "Divide",
            MathOp::Power => "Power",
            MathOp::Sqrt => "Square Root",
            MathOp::Abs => "Absolute",
            MathOp::Floor => "Floor",
            MathOp::Ceil => "Ceil",
            MathOp::Fract => "Fraction",
            MathOp::Modulo => "Modulo",
            MathOp::Min => "Min",
            MathOp::Max => "Max",
            MathOp::Clamp => "Clamp",
            MathOp::Clamp01 => "Saturate",
            MathOp::Mix => "Mix",
            MathOp::Step => "Step",
            MathOp::Smoothstep => "Smoothstep",
            MathOp::Sin => "Sine",
            MathOp::Cos => "Cosine",
            MathOp::Tan => "Tangent",
            MathOp::Asin => "Arcsine",
            MathOp::Acos => "Arccosine",
            MathOp::Atan => "Arctangent",
            MathOp::Atan2 => "Arctangent 2",
            MathOp::Log => "Natural Log",
            MathOp::Exp => "Exponential",
            MathOp::Remap => "Remap",
            MathOp::Sign => "Sign",
            MathOp::Reciprocal => "Reciprocal",
            MathOp::OneMinus => "One Minus",
            MathOp::Negate => "Negate",
            MathOp::MaskedComposite => "Masked Composite",
        }
    }

    pub fn inputs(self) -> &'static [InputSpec] {
        match self {
            MathOp::Add | MathOp::Subtract | MathOp::Min | MathOp::Max | MathOp::Modulo => {
                AB_ZERO
            }
            MathOp::Multiply | MathOp::Divide | MathOp::Power => AB_ONE,
            MathOp::Sqrt
            | MathOp::Abs
            | MathOp::Floor
            | MathOp::Ceil
            | MathOp::Fract
            | MathOp::Clamp01
            | MathOp::Sin
            | MathOp::Cos
            | MathOp::Tan
            | MathOp::Asin
            | MathOp::Acos
            | MathOp::Atan
            | MathOp::Log
            | MathOp::Exp
            | MathOp::Sign
            | MathOp::Reciprocal
            | MathOp::OneMinus
            | MathOp::Negate => X,
            MathOp::Clamp => CLAMP,
            MathOp::Mix => MIX,
            MathOp::Step => STEP,
            MathOp::Smoothstep => SMOOTHSTEP,
            MathOp::Atan2 => ATAN2,
            MathOp::Remap => REMAP,
            MathOp::MaskedComposite => MASKED_COMPOSITE,
        }
    }

    /// Apply the operation to inputs ordered as in [`MathOp::inputs`].
    /// Domain errors and non-finite results are `None`.
    pub fn apply(self, args: &[f64]) -> Option<f64> {
        if args.len() != self.inputs().len() {
            return None;
        }
        let a = args[0];
        let b = args.get(1).copied().unwrap_or(0.0);
        let c = args.get(2).copied().unwrap_or(0.0);

        let result = match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Divide => {
                if b == 0.0 {
                    return None;
                }
                a / b
            }
            MathOp::Power => a.powf(b),
            MathOp::Sqrt => {
                if a < 0.0 {
                    return None;
                }
                a.sqrt()
            }
            MathOp::Abs => a.abs(),
            MathOp::Floor => a.floor(),
            MathOp::Ceil => a.ceil(),
            MathOp::Fract => a - a.floor(),
            MathOp::Modulo => {
                if b == 0.0 {
                    return None;
                }
                // Shader-style mod: result takes the sign of the divisor.
                a - b * (a / b).floor()
            }
            MathOp::Min => a.min(b),
            MathOp::Max => a.max(b),
            // Not f64::clamp, which panics when min > max.
            MathOp::Clamp => a.max(b).min(c),
            MathOp::Clamp01 => a.max(0.0).min(1.0),
            MathOp::Mix => a * (1.0 - c) + b * c,
            MathOp::Step => {
                if b < a {
                    0.0
                } else {
                    1.0
                }
            }
            MathOp::Smoothstep => {
                let span = b - a;
                if span == 0.0 {
                    return None;
                }
                let t = ((c - a) / span).max(0.0).min(1.0);
                t * t * (3.0 - 2.0 * t)
            }
            MathOp::Sin => a.sin(),
            MathOp::Cos => a.cos(),
            MathOp::Tan => a.tan(),
            MathOp::Asin => {
                if !(-1.0..=1.0).contains(&a) {
                    return None;
                }
                a.asin()
            }
            MathOp::Acos => {
                if !(-1.0..=1.0).contains(&a) {
                    return None;
                }
                a.acos()
            }
            MathOp::Atan => a.atan(),
            MathOp::Atan2 => a.atan2(b),
            MathOp::Log => {
                if a <= 0.0 {
                    return None;
                }
                a.ln()
            }
            MathOp::Exp => a.exp(),
            MathOp::Remap => {
                let (in_min, in_max, out_min, out_max) = (b, c, args[3], args[4]);
                let span = in_max - in_min;
                if span == 0.0 {
                    return None;
                }
                out_min + (a - in_min) / span * (out_max - out_min)
            }
            MathOp::Sign => {
                if a > 0.0 {
                    1.0
                } else if a < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            MathOp::Reciprocal => {
                if a == 0.0 {
                    return None;
                }
                1.0 / a
            }
            MathOp::OneMinus => 1.0 - a,
            MathOp::Negate => -a,
            MathOp::MaskedComposite => {
                let mask = c.max(0.0).min(1.0);
                a * (1.0 - mask) + b * mask
            }
        };

        result.is_finite().then_some(result)
    }

    pub fn node_type(self) -> NodeTypeDef {
        let inputs = self.inputs();
        let category = match self {
            MathOp::Sin
            | MathOp::Cos
            | MathOp::Tan
            | MathOp::Asin
            | MathOp::Acos
            | MathOp::Atan
            | MathOp::Atan2 => "Trigonometry",
            _ => "Math",
        };
        NodeTypeDef {
            id: self.type_id().into(),
            name: self.display_name().into(),
            description: None,
            category: Some(category.into()),
            inputs: inputs
                .iter()
                .map(|spec| PortDef {
                    id: spec.port.into(),
                    name: spec.port.into(),
                    port_type: PortType::Float,
                    fallback_param: Some(spec.port.into()),
                })
                .collect(),
            outputs: vec![PortDef {
                id: "out".into(),
                name: "Result".into(),
                port_type: PortType::Float,
                fallback_param: None,
            }],
            params: inputs
                .iter()
                .map(|spec| ParamDef::number(spec.port, spec.port, spec.default))
                .collect(),
        }
    }
}
