//! Built-in template helpers.
//!
//! - `{{#ifpage "index" "about"}}...{{else}}...{{/ifpage}}` renders its block
//!   when the current page is one of the named pages
//! - `{{#unlesspage "index"}}...{{/unlesspage}}` is the inverse
//! - `{{#ifequal a b}}...{{else}}...{{/ifequal}}` renders its block when the
//!   two values are equal
//! - `{{#repeat 3}}...{{/repeat}}` renders its block `n` times

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderErrorReason,
    Renderable,
};

/// Register every built-in helper on a registry.
pub fn register_helpers(registry: &mut Handlebars<'_>) {
    registry.register_helper("ifpage", Box::new(PageHelper { negate: false }));
    registry.register_helper("unlesspage", Box::new(PageHelper { negate: true }));
    registry.register_helper("ifequal", Box::new(IfEqualHelper));
    registry.register_helper("repeat", Box::new(RepeatHelper));
}

fn current_page(ctx: &Context) -> Option<&str> {
    ctx.data().get("page").and_then(|v| v.as_str())
}

struct PageHelper {
    negate: bool,
}

impl HelperDef for PageHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let page = current_page(ctx);
        let listed =
            h.params().iter().any(|p| p.value().as_str().is_some_and(|name| Some(name) == page));

        let block = if listed != self.negate { h.template() } else { h.inverse() };
        match block {
            Some(t) => t.render(r, ctx, rc, out),
            None => Ok(()),
        }
    }
}

struct IfEqualHelper;

impl HelperDef for IfEqualHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let left = h.param(0).ok_or(RenderErrorReason::ParamNotFoundForIndex("ifequal", 0))?;
        let right = h.param(1).ok_or(RenderErrorReason::ParamNotFoundForIndex("ifequal", 1))?;

        let block = if left.value() == right.value() { h.template() } else { h.inverse() };
        match block {
            Some(t) => t.render(r, ctx, rc, out),
            None => Ok(()),
        }
    }
}

struct RepeatHelper;

impl HelperDef for RepeatHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let count = h
            .param(0)
            .ok_or(RenderErrorReason::ParamNotFoundForIndex("repeat", 0))?
            .value()
            .as_u64()
            .ok_or(RenderErrorReason::InvalidParamType("non-negative integer"))?;

        if let Some(t) = h.template() {
            for _ in 0..count {
                t.render(r, ctx, rc, out)?;
            }
        }
        Ok(())
    }
}
