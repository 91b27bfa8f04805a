//! Translator from the 256-bit EVM dialect of structured assembly to the
//! 64-bit wasm dialect.
//!
//! Per object the driver: canonicalizes (disambiguate, hoist, group,
//! main-function, loop-condition rewrite, expression split), runs the
//! word-size transform, displaces names colliding with the polyfill,
//! splices the polyfill in, and re-analyzes the result under the target
//! dialect. Subobjects are translated recursively; raw data members pass
//! through untouched.

mod error;
mod polyfill;
mod word_size_transform;

pub use error::{Result, TranslationError};
pub use polyfill::{POLYFILL_SRC, Polyfill};
pub use word_size_transform::WordSizeTransform;

use sasm_analyses::analyze_block;
use sasm_data::{Dialect, NameDispenser, Object, ObjectMember};
use sasm_passes::{
    Disambiguator, ExpressionSplitter, ForLoopConditionIntoBody, FunctionGrouper, FunctionHoister,
    MainFunction, NameDisplacer, PassContext,
};

pub struct Translator {
    source: Dialect,
    target: Dialect,
    polyfill: Option<Polyfill>,
    polyfill_parses: u32,
}

impl Translator {
    pub fn new() -> Self {
        Self {
            source: Dialect::evm256(),
            target: Dialect::wasm64(),
            polyfill: None,
            polyfill_parses: 0,
        }
    }

    /// Translates one object tree. The polyfill is parsed on first use and
    /// cached for the lifetime of the translator.
    pub fn translate(&mut self, object: &Object) -> Result<Object> {
        if self.polyfill.is_none() {
            self.polyfill = Some(Polyfill::parse()?);
            self.polyfill_parses += 1;
        }
        self.translate_object(object)
    }

    /// How often the polyfill parser has run; exactly once no matter how
    /// many objects one instance translates.
    pub fn polyfill_parse_count(&self) -> u32 {
        self.polyfill_parses
    }

    fn translate_object(&self, object: &Object) -> Result<Object> {
        tracing::debug!(object = %object.name, "translating object");
        let polyfill = self.polyfill.as_ref().expect("polyfill parsed in translate");

        let mut code = object.code.clone();
        let mut reserved: Vec<String> = polyfill.function_names.iter().cloned().collect();
        reserved.push("main".to_string());
        let mut dispenser = NameDispenser::new(&code, reserved);
        let mut ctx = PassContext { dialect: &self.source, dispenser: &mut dispenser };

        Disambiguator::run(&mut ctx, &mut code);
        FunctionHoister::run(&mut ctx, &mut code);
        FunctionGrouper::run(&mut ctx, &mut code);
        MainFunction::run(&mut ctx, &mut code);
        ForLoopConditionIntoBody::run(&mut ctx, &mut code);
        ExpressionSplitter::run(&mut ctx, &mut code);

        WordSizeTransform::run(&self.source, &mut *ctx.dispenser, polyfill, &mut code)?;
        NameDisplacer::run(&mut ctx, &mut code, &polyfill.function_names);

        code.statements.extend(polyfill.statements.iter().cloned());

        analyze_block(&self.target, &code)?;

        let mut translated = Object {
            name: object.name.clone(),
            code,
            subobjects: Vec::with_capacity(object.subobjects.len()),
            sub_index_by_name: object.sub_index_by_name.clone(),
        };
        for member in &object.subobjects {
            translated.subobjects.push(match member {
                ObjectMember::Object(subobject) => {
                    ObjectMember::Object(self.translate_object(subobject)?)
                }
                ObjectMember::Data(data) => ObjectMember::Data(data.clone()),
            });
        }
        Ok(translated)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot convenience wrapper around [`Translator`].
pub fn translate_object(object: &Object) -> Result<Object> {
    Translator::new().translate(object)
}
