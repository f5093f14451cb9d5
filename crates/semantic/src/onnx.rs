//! Local ONNX inference.
//!
//! Tokenizer and session are cached per-thread: the first embedding on any
//! thread pays the load cost, subsequent calls reuse the handle. The hot
//! path is guarded by the caller's deadline, not here.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::{Array, Array2};
use onnxruntime::session::Session;
use tokenizers::Tokenizer;

use crate::{SemanticConfig, SemanticError};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

thread_local! {
    static MODEL_CACHE: RefCell<HashMap<ModelCacheKey, Rc<CachedModel>>> =
        RefCell::new(HashMap::new());
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct ModelCacheKey {
    model_path: PathBuf,
    tokenizer_path: PathBuf,
}

pub(crate) struct CachedModel {
    tokenizer: Tokenizer,
    session: RefCell<Session<'static>>,
}

impl CachedModel {
    fn load(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        if !cfg.model_path.exists() {
            return Err(SemanticError::ModelNotFound(
                cfg.model_path.display().to_string(),
            ));
        }
        if !cfg.tokenizer_path.exists() {
            return Err(SemanticError::TokenizerMissing(
                cfg.tokenizer_path.display().to_string(),
            ));
        }

        let tokenizer = Tokenizer::from_file(&cfg.tokenizer_path)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_model_from_file(cfg.model_path.clone())
            .map_err(|e| SemanticError::Inference(e.to_string()))?;

        Ok(Self {
            tokenizer,
            session: RefCell::new(session),
        })
    }
}

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("geoquery-semantic")
            .build()
            .map_err(|e| SemanticError::Inference(e.to_string()))
    })
}

fn get_or_load_model(cfg: &SemanticConfig) -> Result<Rc<CachedModel>, SemanticError> {
    let key = ModelCacheKey {
        model_path: cfg.model_path.clone(),
        tokenizer_path: cfg.tokenizer_path.clone(),
    };
    MODEL_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(&key) {
            return Ok(handle.clone());
        }
        let handle = Rc::new(CachedModel::load(cfg)?);
        cache.insert(key, handle.clone());
        Ok(handle)
    })
}

/// Embed a single text through the cached local model.
pub(crate) fn embed_with_onnx(text: &str, cfg: &SemanticConfig) -> Result<Vec<f32>, SemanticError> {
    let handle = get_or_load_model(cfg)?;
    let (ids, mask) = encode(&handle.tokenizer, text, cfg.max_sequence_length)?;
    let seq_len = ids.len().max(1);
    let input_ids = Array::from_shape_vec((1, seq_len), ids)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let attn_mask = Array::from_shape_vec((1, seq_len), mask)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let raw = execute_session(&handle.session, input_ids, attn_mask)?;
    pool_to_dimension(raw, cfg.embedding_dim)
}

fn encode(
    tokenizer: &Tokenizer,
    text: &str,
    max_sequence_length: usize,
) -> Result<(Vec<i64>, Vec<i64>), SemanticError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
    let mut mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&x| x as i64)
        .collect();
    if ids.len() > max_sequence_length {
        ids.truncate(max_sequence_length);
        mask.truncate(max_sequence_length);
    }
    if ids.len() != mask.len() {
        return Err(SemanticError::Inference(
            "tokenizer produced mismatched id/mask lengths".into(),
        ));
    }
    Ok((ids, mask))
}

fn execute_session(
    session: &RefCell<Session<'static>>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
) -> Result<Vec<f32>, SemanticError> {
    let (batch, seq_len) = input_ids.dim();
    let mut guard = session.borrow_mut();
    let session_ref = &mut *guard;

    let mut runtime_inputs = Vec::with_capacity(session_ref.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);
    for input in &session_ref.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig("model requested `input_ids` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attn_mask_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig("model requested `attention_mask` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                runtime_inputs.push(Array::from_elem((batch, seq_len), 0_i64).into_dyn());
            }
            other => {
                return Err(SemanticError::Inference(format!(
                    "unsupported model input '{other}'"
                )))
            }
        }
    }
    if runtime_inputs.is_empty() {
        return Err(SemanticError::Inference(
            "model did not declare any inputs".into(),
        ));
    }

    let outputs = session_ref
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let output_tensor = outputs
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))?;

    Ok(output_tensor.iter().copied().collect())
}

/// Collapse the raw output to the configured width. Pooled-output models
/// return exactly `dim` values; token-level models return `seq × dim` and
/// get mean-pooled over the sequence axis.
fn pool_to_dimension(flat: Vec<f32>, dim: usize) -> Result<Vec<f32>, SemanticError> {
    if dim == 0 {
        return Err(SemanticError::InvalidConfig(
            "embedding_dim must be non-zero".into(),
        ));
    }
    if flat.len() == dim {
        return Ok(flat);
    }
    if flat.is_empty() || flat.len() % dim != 0 {
        return Err(SemanticError::Inference(format!(
            "model output length {} is not a multiple of embedding_dim {dim}",
            flat.len()
        )));
    }

    let rows = flat.len() / dim;
    let mut pooled = vec![0f32; dim];
    for row in flat.chunks(dim) {
        for (acc, &value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value;
        }
    }
    for value in &mut pooled {
        *value /= rows as f32;
    }
    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_passthrough_when_already_pooled() {
        let flat = vec![1.0, 2.0, 3.0];
        assert_eq!(pool_to_dimension(flat.clone(), 3).unwrap(), flat);
    }

    #[test]
    fn pool_means_over_sequence_axis() {
        // Two rows of dim 2: [1,3] and [3,5] -> [2,4].
        let flat = vec![1.0, 3.0, 3.0, 5.0];
        assert_eq!(pool_to_dimension(flat, 2).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn pool_rejects_indivisible_output() {
        let err = pool_to_dimension(vec![1.0, 2.0, 3.0], 2).unwrap_err();
        assert!(matches!(err, SemanticError::Inference(_)));
    }

    #[test]
    fn missing_model_is_model_not_found() {
        let cfg = SemanticConfig {
            model_path: PathBuf::from("./missing/model.onnx"),
            tokenizer_path: PathBuf::from("./missing/tokenizer.json"),
            ..SemanticConfig::default()
        };
        let err = embed_with_onnx("hello", &cfg).unwrap_err();
        assert!(matches!(err, SemanticError::ModelNotFound(_)));
    }
}
