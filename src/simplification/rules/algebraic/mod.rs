/// Identity elimination: `a+0`, `0+a`, `a-0`, `a*0`, `0*a`, `a*1`, `1*a`, `a/1`
pub(crate) mod identities;
