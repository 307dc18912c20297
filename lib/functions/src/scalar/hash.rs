use crate::scalar::{simple_string, string_literal};
use md5::{Digest, Md5};
use rdf_pipeline_model::{Term, ThinResult};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

fn hash<D: Digest>(arg: &Term) -> ThinResult<Term> {
    let value = simple_string(arg)?;
    Ok(string_literal(hex::encode(D::digest(value.as_bytes())), None))
}

pub(crate) fn md5(arg: &Term) -> ThinResult<Term> {
    hash::<Md5>(arg)
}

pub(crate) fn sha1(arg: &Term) -> ThinResult<Term> {
    hash::<Sha1>(arg)
}

pub(crate) fn sha256(arg: &Term) -> ThinResult<Term> {
    hash::<Sha256>(arg)
}

pub(crate) fn sha384(arg: &Term) -> ThinResult<Term> {
    hash::<Sha384>(arg)
}

pub(crate) fn sha512(arg: &Term) -> ThinResult<Term> {
    hash::<Sha512>(arg)
}
