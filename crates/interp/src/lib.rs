//! Tree-walking evaluator for the 64-bit wasm dialect.
//!
//! Executes translated programs and individual polyfill functions with wasm
//! integer semantics: wrapping arithmetic, shift amounts taken modulo 64,
//! `clz(0) = 64`, trapping division, little-endian linear memory. Host
//! imports (`eth.*`) run against an in-memory state so storage, calldata
//! and logs are observable from tests.

mod host;

pub use host::{Env, HostState, LogEntry};

use sasm_data::{Block, Expression, FunctionCall, FunctionDefinition, Statement};
use std::{collections::HashMap, rc::Rc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("unreachable executed")]
    Unreachable,
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("call to undefined function `{0}`")]
    UndefinedFunction(String),
    #[error("use of undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("host import `{0}` is not modelled by the interpreter")]
    UnsupportedImport(String),
    #[error("function `{name}` takes {expected} arguments, got {found}")]
    ArgumentCountMismatch { name: String, expected: usize, found: usize },
    #[error("expected {expected} values, got {found}")]
    ValueCountMismatch { expected: usize, found: usize },
    #[error("literal does not fit a 64-bit word")]
    WideLiteral,
    #[error("memory access out of bounds at offset {0}")]
    MemoryOutOfBounds(u64),
    #[error("step budget exhausted")]
    OutOfFuel,
}

/// Non-local exits during evaluation: traps, and the two host-driven
/// terminations.
#[derive(Debug)]
pub enum Interrupt {
    Trap(InterpError),
    Finish(Vec<u8>),
    Revert(Vec<u8>),
}

impl From<InterpError> for Interrupt {
    fn from(err: InterpError) -> Self {
        Interrupt::Trap(err)
    }
}

pub(crate) type EResult<T> = Result<T, Interrupt>;

/// Result of running a function to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The function returned normally with these values.
    Values(Vec<u64>),
    /// The program called `eth.finish` with this return data.
    Finished(Vec<u8>),
    /// The program called `eth.revert` with this revert data.
    Reverted(Vec<u8>),
}

enum Flow {
    Normal,
    Break,
    Continue,
    Leave,
}

const DEFAULT_FUEL: u64 = 50_000_000;

pub struct Interpreter {
    functions: HashMap<String, Rc<FunctionDefinition>>,
    pub state: HostState,
    /// Statement budget; guards against runaway loops in tests.
    pub fuel: u64,
}

impl Interpreter {
    /// Collects every function defined anywhere in `block`. Statement
    /// execution skips the definitions themselves.
    pub fn new(block: &Block) -> Self {
        let mut functions = HashMap::new();
        collect_functions(block, &mut functions);
        Self { functions, state: HostState::default(), fuel: DEFAULT_FUEL }
    }

    /// Runs the translated program's entry function.
    pub fn run_main(&mut self) -> Result<CallOutcome, InterpError> {
        self.call("main", &[])
    }

    /// Calls a function by name, mapping host terminations into outcomes.
    pub fn call(&mut self, name: &str, args: &[u64]) -> Result<CallOutcome, InterpError> {
        match self.call_function(name, args) {
            Ok(values) => Ok(CallOutcome::Values(values)),
            Err(Interrupt::Finish(data)) => Ok(CallOutcome::Finished(data)),
            Err(Interrupt::Revert(data)) => Ok(CallOutcome::Reverted(data)),
            Err(Interrupt::Trap(err)) => Err(err),
        }
    }

    /// Calls a function expecting a normal return; panics on termination.
    /// Convenient for exercising polyfill functions directly.
    pub fn call_values(&mut self, name: &str, args: &[u64]) -> Result<Vec<u64>, InterpError> {
        match self.call(name, args)? {
            CallOutcome::Values(values) => Ok(values),
            other => panic!("expected `{name}` to return values, got {other:?}"),
        }
    }

    fn call_function(&mut self, name: &str, args: &[u64]) -> EResult<Vec<u64>> {
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| InterpError::UndefinedFunction(name.to_string()))?;
        if args.len() != function.parameters.len() {
            return Err(InterpError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: function.parameters.len(),
                found: args.len(),
            }
            .into());
        }

        let mut scopes = Scopes::default();
        scopes.push();
        for (parameter, value) in function.parameters.iter().zip(args) {
            scopes.declare(parameter, *value);
        }
        for name in &function.returns {
            scopes.declare(name, 0);
        }

        // Leave and falling off the end both return the current values of
        // the return variables.
        self.exec_block(&function.body, &mut scopes)?;

        function.returns.iter().map(|name| scopes.get(name).map_err(Interrupt::from)).collect()
    }

    fn exec_block(&mut self, block: &Block, scopes: &mut Scopes) -> EResult<Flow> {
        scopes.push();
        for statement in &block.statements {
            match self.exec_statement(statement, scopes)? {
                Flow::Normal => {}
                flow => {
                    scopes.pop();
                    return Ok(flow);
                }
            }
        }
        scopes.pop();
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, statement: &Statement, scopes: &mut Scopes) -> EResult<Flow> {
        self.fuel = self.fuel.checked_sub(1).ok_or(InterpError::OutOfFuel)?;
        match statement {
            Statement::Block(block) => self.exec_block(block, scopes),
            Statement::VariableDeclaration(decl) => {
                let values = match &decl.value {
                    Some(value) => self.eval_expression(value, scopes)?,
                    None => vec![0; decl.variables.len()],
                };
                if values.len() != decl.variables.len() {
                    return Err(InterpError::ValueCountMismatch {
                        expected: decl.variables.len(),
                        found: values.len(),
                    }
                    .into());
                }
                for (name, value) in decl.variables.iter().zip(values) {
                    scopes.declare(name, value);
                }
                Ok(Flow::Normal)
            }
            Statement::Assignment(assignment) => {
                let values = self.eval_expression(&assignment.value, scopes)?;
                if values.len() != assignment.targets.len() {
                    return Err(InterpError::ValueCountMismatch {
                        expected: assignment.targets.len(),
                        found: values.len(),
                    }
                    .into());
                }
                for (name, value) in assignment.targets.iter().zip(values) {
                    scopes.set(name, value)?;
                }
                Ok(Flow::Normal)
            }
            Statement::Expression(call) => {
                self.eval_call(call, scopes)?;
                Ok(Flow::Normal)
            }
            Statement::If(if_st) => {
                if self.eval_single(&if_st.condition, scopes)? != 0 {
                    return self.exec_block(&if_st.body, scopes);
                }
                Ok(Flow::Normal)
            }
            Statement::Switch(switch) => {
                let discriminator = self.eval_single(&switch.expression, scopes)?;
                for case in &switch.cases {
                    if case.value.value == alloy_primitives::U256::from(discriminator) {
                        return self.exec_block(&case.body, scopes);
                    }
                }
                if let Some(default) = &switch.default {
                    return self.exec_block(default, scopes);
                }
                Ok(Flow::Normal)
            }
            Statement::ForLoop(for_loop) => self.exec_for(for_loop, scopes),
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Leave => Ok(Flow::Leave),
            Statement::FunctionDefinition(_) => Ok(Flow::Normal),
        }
    }

    fn exec_for(
        &mut self,
        for_loop: &sasm_data::ForLoop,
        scopes: &mut Scopes,
    ) -> EResult<Flow> {
        // The init block's scope spans the condition, post and body.
        scopes.push();
        for statement in &for_loop.pre.statements {
            match self.exec_statement(statement, scopes)? {
                Flow::Normal => {}
                flow => {
                    scopes.pop();
                    return Ok(flow);
                }
            }
        }
        loop {
            if self.eval_single(&for_loop.condition, scopes)? == 0 {
                break;
            }
            match self.exec_block(&for_loop.body, scopes)? {
                Flow::Break => break,
                Flow::Leave => {
                    scopes.pop();
                    return Ok(Flow::Leave);
                }
                Flow::Normal | Flow::Continue => {}
            }
            if let Flow::Leave = self.exec_block(&for_loop.post, scopes)? {
                scopes.pop();
                return Ok(Flow::Leave);
            }
        }
        scopes.pop();
        Ok(Flow::Normal)
    }

    fn eval_expression(&mut self, expression: &Expression, scopes: &mut Scopes) -> EResult<Vec<u64>> {
        match expression {
            Expression::Literal(literal) => {
                let limbs = literal.value.as_limbs();
                if limbs[1] != 0 || limbs[2] != 0 || limbs[3] != 0 {
                    return Err(InterpError::WideLiteral.into());
                }
                Ok(vec![limbs[0]])
            }
            Expression::Identifier(identifier) => {
                Ok(vec![scopes.get(&identifier.name).map_err(Interrupt::from)?])
            }
            Expression::FunctionCall(call) => self.eval_call(call, scopes),
        }
    }

    fn eval_single(&mut self, expression: &Expression, scopes: &mut Scopes) -> EResult<u64> {
        let values = self.eval_expression(expression, scopes)?;
        if values.len() != 1 {
            return Err(
                InterpError::ValueCountMismatch { expected: 1, found: values.len() }.into()
            );
        }
        Ok(values[0])
    }

    fn eval_call(&mut self, call: &FunctionCall, scopes: &mut Scopes) -> EResult<Vec<u64>> {
        let mut args = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            args.push(self.eval_single(argument, scopes)?);
        }
        if self.functions.contains_key(&call.name) {
            return self.call_function(&call.name, &args);
        }
        self.eval_builtin(&call.name, &args)
    }

    fn eval_builtin(&mut self, name: &str, args: &[u64]) -> EResult<Vec<u64>> {
        let bool64 = |condition: bool| u64::from(condition);
        let values = match (name, args) {
            ("i64.add", [a, b]) => vec![a.wrapping_add(*b)],
            ("i64.sub", [a, b]) => vec![a.wrapping_sub(*b)],
            ("i64.mul", [a, b]) => vec![a.wrapping_mul(*b)],
            ("i64.div_u", [a, b]) => {
                let b = (*b != 0).then_some(*b).ok_or(InterpError::DivisionByZero)?;
                vec![a / b]
            }
            ("i64.rem_u", [a, b]) => {
                let b = (*b != 0).then_some(*b).ok_or(InterpError::DivisionByZero)?;
                vec![a % b]
            }
            ("i64.and", [a, b]) => vec![a & b],
            ("i64.or", [a, b]) => vec![a | b],
            ("i64.xor", [a, b]) => vec![a ^ b],
            // wasm shift amounts are taken modulo the bit width
            ("i64.shl", [a, b]) => vec![a << (b & 63)],
            ("i64.shr_u", [a, b]) => vec![a >> (b & 63)],
            ("i64.eq", [a, b]) => vec![bool64(a == b)],
            ("i64.ne", [a, b]) => vec![bool64(a != b)],
            ("i64.eqz", [a]) => vec![bool64(*a == 0)],
            ("i64.lt_u", [a, b]) => vec![bool64(a < b)],
            ("i64.gt_u", [a, b]) => vec![bool64(a > b)],
            ("i64.le_u", [a, b]) => vec![bool64(a <= b)],
            ("i64.ge_u", [a, b]) => vec![bool64(a >= b)],
            ("i64.clz", [a]) => vec![u64::from(a.leading_zeros())],
            ("i64.load", [addr]) => vec![self.state.load_i64(*addr).map_err(Interrupt::from)?],
            ("i64.store", [addr, value]) => {
                self.state.store_i64(*addr, *value).map_err(Interrupt::from)?;
                vec![]
            }
            ("i64.store8", [addr, value]) => {
                self.state.store_byte(*addr, *value as u8).map_err(Interrupt::from)?;
                vec![]
            }
            ("unreachable", []) => return Err(InterpError::Unreachable.into()),
            _ if name.starts_with("eth.") => return self.eval_host(name, args),
            _ => return Err(InterpError::UndefinedFunction(name.to_string()).into()),
        };
        Ok(values)
    }
}

fn collect_functions(block: &Block, out: &mut HashMap<String, Rc<FunctionDefinition>>) {
    for statement in &block.statements {
        match statement {
            Statement::FunctionDefinition(function) => {
                collect_functions(&function.body, out);
                out.insert(function.name.clone(), Rc::new(function.clone()));
            }
            Statement::Block(inner) => collect_functions(inner, out),
            Statement::If(if_st) => collect_functions(&if_st.body, out),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    collect_functions(&case.body, out);
                }
                if let Some(default) = &switch.default {
                    collect_functions(default, out);
                }
            }
            Statement::ForLoop(for_loop) => {
                collect_functions(&for_loop.pre, out);
                collect_functions(&for_loop.post, out);
                collect_functions(&for_loop.body, out);
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct Scopes {
    stack: Vec<HashMap<String, u64>>,
}

impl Scopes {
    fn push(&mut self) {
        self.stack.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn declare(&mut self, name: &str, value: u64) {
        self.stack.last_mut().expect("scope present").insert(name.to_string(), value);
    }

    fn get(&self, name: &str) -> Result<u64, InterpError> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| InterpError::UndefinedVariable(name.to_string()))
    }

    fn set(&mut self, name: &str, value: u64) -> Result<(), Interrupt> {
        for scope in self.stack.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(InterpError::UndefinedVariable(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasm_parser::parse_block;

    fn interpreter(source: &str) -> Interpreter {
        Interpreter::new(&parse_block(source).expect("parse failed"))
    }

    #[test]
    fn evaluates_arithmetic_and_control_flow() {
        let mut interp = interpreter(
            r#"
{
    function sum_to(n) -> total {
        for { let i := 1 } i64.le_u(i, n) { i := i64.add(i, 1) } {
            total := i64.add(total, i)
        }
    }
}
"#,
        );
        assert_eq!(interp.call_values("sum_to", &[10]).unwrap(), vec![55]);
    }

    #[test]
    fn leave_returns_current_values() {
        let mut interp = interpreter(
            r#"
{
    function pick(flag) -> r {
        r := 1
        if flag {
            leave
        }
        r := 2
    }
}
"#,
        );
        assert_eq!(interp.call_values("pick", &[1]).unwrap(), vec![1]);
        assert_eq!(interp.call_values("pick", &[0]).unwrap(), vec![2]);
    }

    #[test]
    fn switch_selects_case_or_default() {
        let mut interp = interpreter(
            r#"
{
    function classify(x) -> r {
        switch x
        case 0 { r := 100 }
        case 1 { r := 101 }
        default { r := 102 }
    }
}
"#,
        );
        assert_eq!(interp.call_values("classify", &[0]).unwrap(), vec![100]);
        assert_eq!(interp.call_values("classify", &[1]).unwrap(), vec![101]);
        assert_eq!(interp.call_values("classify", &[9]).unwrap(), vec![102]);
    }

    #[test]
    fn wasm_shift_semantics_are_modulo_64() {
        let mut interp = interpreter(
            r#"
{
    function shifts(x) -> a, b {
        a := i64.shl(x, 64)
        b := i64.shr_u(x, 70)
    }
}
"#,
        );
        // Amounts wrap: 64 acts like 0, 70 like 6.
        assert_eq!(interp.call_values("shifts", &[0x80]).unwrap(), vec![0x80, 0x2]);
    }

    #[test]
    fn unreachable_traps() {
        let mut interp = interpreter("{ function boom() { unreachable() } }");
        assert_eq!(interp.call("boom", &[]), Err(InterpError::Unreachable));
    }

    #[test]
    fn memory_is_little_endian() {
        let mut interp = interpreter(
            r#"
{
    function probe() -> lo {
        i64.store(0, 0x0102030405060708)
        lo := i64.load(0)
    }
}
"#,
        );
        assert_eq!(interp.call_values("probe", &[]).unwrap(), vec![0x0102030405060708]);
        assert_eq!(interp.state.memory[0], 0x08);
        assert_eq!(interp.state.memory[7], 0x01);
    }

    #[test]
    fn runaway_loops_run_out_of_fuel() {
        let mut interp = interpreter("{ function spin() { for { } 1 { } { } } }");
        interp.fuel = 1_000;
        assert_eq!(interp.call("spin", &[]), Err(InterpError::OutOfFuel));
    }
}
