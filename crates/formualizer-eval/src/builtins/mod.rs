//! The ~70-function whitelisted catalog, organized the way
//! `wolfxl.calc._functions` groups `_BUILTINS` — by category file, with
//! a single `register_all` entry point the registry calls at
//! construction.

pub mod conditional;
pub mod datetime;
pub mod financial;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod stats;
pub mod text;

use crate::registry::{Callable, FunctionRegistry};

pub fn register_all(reg: &mut FunctionRegistry) {
    // Math
    reg.register("SUM", Callable::Normal(math::sum));
    reg.register("ABS", Callable::Normal(math::abs));
    reg.register("ROUND", Callable::Normal(math::round));
    reg.register("ROUNDUP", Callable::Normal(math::roundup));
    reg.register("ROUNDDOWN", Callable::Normal(math::rounddown));
    reg.register("INT", Callable::Normal(math::int));
    reg.register("MOD", Callable::Normal(math::modulo));
    reg.register("POWER", Callable::Normal(math::power));
    reg.register("SQRT", Callable::Normal(math::sqrt));
    reg.register("SIGN", Callable::Normal(math::sign));

    // Logic
    reg.register("IF", Callable::Normal(logical::if_fn));
    reg.register("AND", Callable::Normal(logical::and));
    reg.register("OR", Callable::Normal(logical::or));
    reg.register("NOT", Callable::Normal(logical::not));
    reg.register("IFERROR", Callable::Normal(logical::iferror));

    // Lookup
    reg.register("VLOOKUP", Callable::Normal(lookup::vlookup));
    reg.register("HLOOKUP", Callable::Normal(lookup::hlookup));
    reg.register("INDEX", Callable::Normal(lookup::index));
    reg.register("MATCH", Callable::Normal(lookup::match_fn));
    reg.register("OFFSET", Callable::Raw(lookup::offset));
    reg.register("CHOOSE", Callable::Normal(lookup::choose));
    reg.register("XLOOKUP", Callable::Normal(lookup::xlookup));

    // Stats
    reg.register("AVERAGE", Callable::Normal(stats::average));
    reg.register("AVERAGEIF", Callable::Normal(stats::averageif));
    reg.register("AVERAGEIFS", Callable::Normal(stats::averageifs));
    reg.register("COUNT", Callable::Normal(stats::count));
    reg.register("COUNTA", Callable::Normal(stats::counta));
    reg.register("COUNTIF", Callable::Normal(stats::countif));
    reg.register("COUNTIFS", Callable::Normal(stats::countifs));
    reg.register("MIN", Callable::Normal(stats::min));
    reg.register("MINIFS", Callable::Normal(stats::minifs));
    reg.register("MAX", Callable::Normal(stats::max));
    reg.register("MAXIFS", Callable::Normal(stats::maxifs));
    reg.register("SUMIF", Callable::Normal(stats::sumif));
    reg.register("SUMIFS", Callable::Normal(stats::sumifs));

    // Financial
    reg.register("PV", Callable::Normal(financial::pv));
    reg.register("FV", Callable::Normal(financial::fv));
    reg.register("PMT", Callable::Normal(financial::pmt));
    reg.register("NPV", Callable::Normal(financial::npv));
    reg.register("IRR", Callable::Normal(financial::irr));
    reg.register("SLN", Callable::Normal(financial::sln));
    reg.register("DB", Callable::Normal(financial::db));

    // Text
    reg.register("LEFT", Callable::Normal(text::left));
    reg.register("RIGHT", Callable::Normal(text::right));
    reg.register("MID", Callable::Normal(text::mid));
    reg.register("LEN", Callable::Normal(text::len));
    reg.register("CONCATENATE", Callable::Normal(text::concatenate));
    reg.register("UPPER", Callable::Normal(text::upper));
    reg.register("LOWER", Callable::Normal(text::lower));
    reg.register("TRIM", Callable::Normal(text::trim));
    reg.register("SUBSTITUTE", Callable::Normal(text::substitute));
    reg.register("TEXT", Callable::Normal(text::text));
    reg.register("REPT", Callable::Normal(text::rept));
    reg.register("EXACT", Callable::Normal(text::exact));
    reg.register("FIND", Callable::Normal(text::find));

    // Date/Time — raw-args so the clock-sampled `Interpreter::now` is
    // reachable without a hidden global.
    reg.register("TODAY", Callable::Raw(datetime_raw::today));
    reg.register("NOW", Callable::Raw(datetime_raw::now));
    reg.register("DATE", Callable::Normal(datetime::date));
    reg.register("YEAR", Callable::Normal(datetime::year));
    reg.register("MONTH", Callable::Normal(datetime::month));
    reg.register("DAY", Callable::Normal(datetime::day));
    reg.register("EDATE", Callable::Normal(datetime::edate));
    reg.register("EOMONTH", Callable::Normal(datetime::eomonth));
    reg.register("DAYS", Callable::Normal(datetime::days));
    reg.register("HOUR", Callable::Normal(datetime::hour));
    reg.register("MINUTE", Callable::Normal(datetime::minute));
    reg.register("SECOND", Callable::Normal(datetime::second));
}

/// `TODAY`/`NOW` take no resolved arguments but need the interpreter's
/// sampled clock, so they ride the raw-args calling convention purely
/// for access to `&Interpreter` rather than for unresolved tokens.
mod datetime_raw {
    use crate::args::Value;
    use crate::interpreter::Interpreter;

    pub fn today(_raw_args: &[String], interp: &Interpreter, _sheet: &str) -> Value {
        super::datetime::today(interp)
    }

    pub fn now(_raw_args: &[String], interp: &Interpreter, _sheet: &str) -> Value {
        super::datetime::now(interp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_preloads_the_whitelisted_catalog() {
        let reg = FunctionRegistry::new();
        for name in ["SUM", "VLOOKUP", "XLOOKUP", "IRR", "SUBSTITUTE", "EOMONTH", "OFFSET"] {
            assert!(reg.has(name), "{name} should be registered");
        }
        assert!(!reg.has("NOT_A_FUNCTION"));
    }
}
