use crate::layout::RegisterKind;
use crate::register::parse_value;
use crate::sample::format_q6;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use uad_link::{parse_int, DeviceConfig};

pub const DEFAULT_OUTPUT: &str = "output.vec";

/// Optional YAML bench file: which instance to drive and where results go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(flatten)]
    pub device: DeviceConfig,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            output: default_output(),
        }
    }
}

pub fn load_bench_config(path: impl AsRef<Path>) -> anyhow::Result<BenchConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading bench config: {}", path.display()))?;
    let cfg: BenchConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing yaml: {}", path.display()))?;
    Ok(cfg)
}

/// One row of a reset-vector file: the value a field must hold after reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetExpectation {
    pub register: RegisterKind,
    pub field: String,
    pub value: u32,
}

/// One row of a coefficient config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoefSetting {
    pub slot: u8,
    pub enable: u32,
    pub value: u32,
}

#[derive(Debug, Deserialize)]
struct ResetRow {
    register: String,
    field: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct CoefRow {
    coef: String,
    en: String,
    value: String,
}

fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(rdr)
}

fn value_of(s: &str, line: usize) -> anyhow::Result<u32> {
    parse_value(s).with_context(|| format!("row {line}: invalid value {s:?}"))
}

/// Parse `register,field,value` rows. Register and field names are checked
/// against the layouts here so a typo fails before the device is touched.
pub fn read_reset_vector<R: Read>(rdr: R) -> anyhow::Result<Vec<ResetExpectation>> {
    let mut out = Vec::new();
    for (i, row) in csv_reader(rdr).deserialize::<ResetRow>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("row {line}: malformed reset vector"))?;
        let register: RegisterKind = row
            .register
            .parse()
            .with_context(|| format!("row {line}"))?;
        let (_, field) = register
            .layout()
            .field(&row.field)
            .with_context(|| format!("row {line}"))?;
        out.push(ResetExpectation {
            register,
            field: field.name.to_string(),
            value: value_of(&row.value, line)?,
        });
    }
    Ok(out)
}

/// Parse `coef,en,value` rows; `coef` is the slot number 0..=3.
pub fn read_coef_config<R: Read>(rdr: R) -> anyhow::Result<Vec<CoefSetting>> {
    let mut out = Vec::new();
    for (i, row) in csv_reader(rdr).deserialize::<CoefRow>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("row {line}: malformed coefficient config"))?;
        let slot = parse_int(&row.coef)
            .and_then(|n| u8::try_from(n).ok())
            .filter(|n| *n < 4)
            .with_context(|| {
                format!("row {line}: coefficient slot must be 0..=3, got {:?}", row.coef)
            })?;
        out.push(CoefSetting {
            slot,
            enable: value_of(&row.en, line)?,
            value: value_of(&row.value, line)?,
        });
    }
    Ok(out)
}

/// One integer sample per non-empty line.
pub fn read_samples<R: Read>(mut rdr: R) -> anyhow::Result<Vec<i64>> {
    let mut text = String::new();
    rdr.read_to_string(&mut text)?;
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        let v = parse_int(t).with_context(|| format!("line {}: invalid sample {t:?}", i + 1))?;
        out.push(v);
    }
    Ok(out)
}

fn open(path: &Path, what: &str) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("opening {what}: {}", path.display()))
}

pub fn load_reset_vector(path: impl AsRef<Path>) -> anyhow::Result<Vec<ResetExpectation>> {
    let path = path.as_ref();
    read_reset_vector(open(path, "reset vector")?)
        .with_context(|| format!("in {}", path.display()))
}

pub fn load_coef_config(path: impl AsRef<Path>) -> anyhow::Result<Vec<CoefSetting>> {
    let path = path.as_ref();
    read_coef_config(open(path, "coefficient config")?)
        .with_context(|| format!("in {}", path.display()))
}

pub fn load_samples(path: impl AsRef<Path>) -> anyhow::Result<Vec<i64>> {
    let path = path.as_ref();
    read_samples(open(path, "sample vector")?).with_context(|| format!("in {}", path.display()))
}

/// Write one Q6 value per driven sample, in drive order.
pub fn write_output_vec<W: Write>(mut w: W, samples: &[i64]) -> std::io::Result<()> {
    for s in samples {
        writeln!(w, "{}", format_q6(*s))?;
    }
    w.flush()
}

pub fn save_output_vec(path: impl AsRef<Path>, samples: &[i64]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("creating output: {}", path.display()))?;
    write_output_vec(BufWriter::new(file), samples)
        .with_context(|| format!("writing output: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uad_link::Instance;

    #[test]
    fn test_reset_vector_rows() {
        let text = "register,field,value\ncsr,halt,0x0\n\
                    outcap, high_capacity ,0x7f\n# note\ncoef,c3,-1\n";
        let rows = read_reset_vector(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].register, RegisterKind::Outcap);
        assert_eq!(rows[1].field, "hcap");
        assert_eq!(rows[1].value, 0x7F);
        assert_eq!(rows[2].value, u32::MAX);
    }

    #[test]
    fn test_reset_vector_rejects_unknown_names() {
        let err = read_reset_vector("register,field,value\ncsr,hlat,0\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
        assert!(read_reset_vector("register,field,value\nfifo,halt,0\n".as_bytes()).is_err());
    }

    #[test]
    fn test_coef_config_rows() {
        let text = "coef,en,value\n0,1,0x10\n2,0x1,0x20\n";
        let rows = read_coef_config(text.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                CoefSetting { slot: 0, enable: 1, value: 0x10 },
                CoefSetting { slot: 2, enable: 1, value: 0x20 },
            ]
        );
        assert!(read_coef_config("coef,en,value\n4,1,0\n".as_bytes()).is_err());
        assert!(read_coef_config("coef,en,value\n1,1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_samples_skip_blank_lines() {
        let rows = read_samples("0x40\n\n  0x80 \n17\n".as_bytes()).unwrap();
        assert_eq!(rows, vec![0x40, 0x80, 17]);
        assert!(read_samples("0x40\nnope\n".as_bytes()).is_err());
    }

    #[test]
    fn test_output_vec_format() {
        let mut buf = Vec::new();
        write_output_vec(&mut buf, &[0x40, 0xFF, 0x00]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1.0\n-0.015625\n0.0\n");
    }

    #[test]
    fn test_files_round_trip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.vec");
        fs::write(&input, "0x7f\n0x80\n").unwrap();
        let samples = load_samples(&input).unwrap();

        let out = dir.path().join("output.vec");
        save_output_vec(&out, &samples).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "1.984375\n-2.0\n");
        assert!(load_samples(dir.path().join("missing.vec")).is_err());
    }

    #[test]
    fn test_bench_config_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bench.yaml");
        fs::write(&path, "instance: impl3\ninsts_dir: /opt/uad\n").unwrap();
        let cfg = load_bench_config(&path).unwrap();
        assert_eq!(cfg.device.instance, Instance::Impl3);
        assert_eq!(cfg.device.insts_dir, PathBuf::from("/opt/uad"));
        assert!(cfg.device.path.is_none());
        assert_eq!(cfg.output, PathBuf::from(DEFAULT_OUTPUT));
    }
}
