//! Mock algorithm layer for testing suite consumers
//!
//! Every family has a mock implementation registered under the high-bit
//! selector of its namespace, and [`register_mock`] publishes a whole
//! suite of them. Each mock routes every vtable entry to an installable
//! callback held in the live options' implementation tail; a method whose
//! callback has not been installed fails with
//! [`CryptoError::MockNotAdded`], including the context-init path itself.
//!
//! Callbacks are installed through the `add_mock_*` helpers on
//! [`SuiteOptions`]; they receive the family method's data arguments and
//! return a status, so a test can observe calls, fake outputs by writing
//! into the caller's buffers, or inject any error code. Disposal hooks
//! take no arguments, return nothing and are optional.

use std::any::Any;
use std::sync::{Arc, Mutex, Once};

use crate::agreement::{
    KeyAgreementDescriptor, KeyAgreementEngine, KeyAgreementOptions,
};
use crate::alloc::SharedAllocator;
use crate::block::{BlockDescriptor, BlockEngine, BlockOptions};
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{HashDescriptor, HashEngine, HashOptions};
use crate::kdf::{
    KeyDerivationDescriptor, KeyDerivationEngine, KeyDerivationOptions,
};
use crate::mac::{MacDescriptor, MacEngine, MacOptions};
use crate::prng::{PrngDescriptor, PrngEngine, PrngOptions};
use crate::registry::{
    self, Descriptor, Registration, INTERFACE_BLOCK_CIPHER, INTERFACE_HASH,
    INTERFACE_KEY_AGREEMENT, INTERFACE_KEY_DERIVATION, INTERFACE_MAC,
    INTERFACE_PRNG, INTERFACE_SIGNATURE, INTERFACE_STREAM_CIPHER,
    INTERFACE_SUITE,
};
use crate::sign::{SignatureDescriptor, SignatureEngine, SignatureOptions};
use crate::stream::{StreamDescriptor, StreamEngine, StreamOptions};
use crate::suite::{self, SuiteDescriptor, SuiteOptions};

/// Mock hash selector.
pub const HASH_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock digital signature selector.
pub const SIGNATURE_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock PRNG source selector.
pub const PRNG_SOURCE_MOCK: u32 = 0x8000_0000;
/// Mock MAC selector.
pub const MAC_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock short MAC selector.
pub const MAC_ALGORITHM_SHORT_MOCK: u32 = 0x4000_0000;
/// Mock key agreement selector for authentication.
pub const KEY_AGREEMENT_ALGORITHM_MOCK_AUTH: u32 = 0x8000_0000;
/// Mock key agreement selector for cipher keying.
pub const KEY_AGREEMENT_ALGORITHM_MOCK_CIPHER: u32 = 0x4000_0000;
/// Mock key derivation selector.
pub const KEY_DERIVATION_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock block cipher selector.
pub const BLOCK_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock stream cipher selector.
pub const STREAM_ALGORITHM_MOCK: u32 = 0x8000_0000;
/// Mock crypto suite selector.
pub const SUITE_MOCK: u32 = 0x8000_0000;

type Slot<F> = Mutex<Option<F>>;
type Thunk0 = Box<dyn Fn() -> CryptoResult<()> + Send>;
type DisposeThunk = Box<dyn Fn() + Send>;

/// Invoke a mocked method, failing when no callback is installed.
macro_rules! dispatch {
    ($slot:expr $(, $arg:expr)*) => {
        match &*$slot.lock().expect("mock slot lock poisoned") {
            Some(callback) => callback($($arg),*),
            None => Err(CryptoError::MockNotAdded),
        }
    };
}

/// Invoke an optional disposal hook.
macro_rules! dispatch_dispose {
    ($slot:expr) => {
        if let Some(callback) =
            &*$slot.lock().expect("mock slot lock poisoned")
        {
            callback();
        }
    };
}

/// Recover a family's mock state from its options' implementation tail.
fn mock_state<T: Any + Send + Sync>(
    tail: Option<&Arc<dyn Any + Send + Sync>>,
) -> CryptoResult<Arc<T>> {
    tail.and_then(|state| Arc::clone(state).downcast::<T>().ok())
        .ok_or(CryptoError::MockNotAdded)
}

// ------------------------------- hash ----------------------------------

/// Installable callbacks for the mock hash.
#[derive(Default)]
pub struct HashMock {
    init: Slot<Thunk0>,
    dispose: Slot<DisposeThunk>,
    digest: Slot<Box<dyn Fn(&[u8]) -> CryptoResult<()> + Send>>,
    finalize: Slot<Box<dyn Fn(&mut Buffer) -> CryptoResult<()> + Send>>,
}

struct MockHashEngine {
    mock: Arc<HashMock>,
}

impl HashEngine for MockHashEngine {
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        dispatch!(self.mock.digest, data)
    }

    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()> {
        dispatch!(self.mock.finalize, out)
    }
}

impl Drop for MockHashEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_hash_engine(
    options: &HashOptions,
) -> CryptoResult<Box<dyn HashEngine>> {
    let mock = mock_state::<HashMock>(options.implementation())?;
    dispatch!(mock.init)?;
    Ok(Box::new(MockHashEngine { mock }))
}

fn mock_hash_options_init(options: &mut HashOptions) -> CryptoResult<()> {
    options.set_implementation(Arc::new(HashMock::default()));
    Ok(())
}

static MOCK_HASH_DESCRIPTOR: HashDescriptor = HashDescriptor {
    algorithm: HASH_ALGORITHM_MOCK,
    hash_size: 64,
    block_size: 128,
    new_engine: new_mock_hash_engine,
    options_init: Some(mock_hash_options_init),
};

/// Register the mock hash algorithm. Idempotent.
pub fn register_hash_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_HASH,
            implementation: HASH_ALGORITHM_MOCK,
            features: HASH_ALGORITHM_MOCK,
            descriptor: Descriptor::Hash(&MOCK_HASH_DESCRIPTOR),
        });
    });
}

// -------------------------------- mac ----------------------------------

/// Installable callbacks for a mock MAC (long or short).
#[derive(Default)]
pub struct MacMock {
    init: Slot<Box<dyn Fn(&Buffer) -> CryptoResult<()> + Send>>,
    dispose: Slot<DisposeThunk>,
    digest: Slot<Box<dyn Fn(&[u8]) -> CryptoResult<()> + Send>>,
    finalize: Slot<Box<dyn Fn(&mut Buffer) -> CryptoResult<()> + Send>>,
}

struct MockMacEngine {
    mock: Arc<MacMock>,
}

impl MacEngine for MockMacEngine {
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        dispatch!(self.mock.digest, data)
    }

    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()> {
        dispatch!(self.mock.finalize, out)
    }
}

impl Drop for MockMacEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_mac_engine(
    options: &MacOptions,
    key: &Buffer,
) -> CryptoResult<Box<dyn MacEngine>> {
    let mock = mock_state::<MacMock>(options.implementation())?;
    dispatch!(mock.init, key)?;
    Ok(Box::new(MockMacEngine { mock }))
}

fn mock_mac_options_init(options: &mut MacOptions) -> CryptoResult<()> {
    options.set_implementation(Arc::new(MacMock::default()));
    Ok(())
}

static MOCK_MAC_DESCRIPTOR: MacDescriptor = MacDescriptor {
    algorithm: MAC_ALGORITHM_MOCK,
    key_size: 64,
    mac_size: 64,
    key_expansion_supported: true,
    maximum_message_size: usize::MAX,
    hash_algorithm: 0,
    new_engine: new_mock_mac_engine,
    options_init: Some(mock_mac_options_init),
};

static MOCK_MAC_SHORT_DESCRIPTOR: MacDescriptor = MacDescriptor {
    algorithm: MAC_ALGORITHM_SHORT_MOCK,
    key_size: 32,
    mac_size: 32,
    key_expansion_supported: true,
    maximum_message_size: usize::MAX,
    hash_algorithm: 0,
    new_engine: new_mock_mac_engine,
    options_init: Some(mock_mac_options_init),
};

/// Register the mock MAC algorithm. Idempotent.
pub fn register_mac_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_MAC,
            implementation: MAC_ALGORITHM_MOCK,
            features: MAC_ALGORITHM_MOCK,
            descriptor: Descriptor::Mac(&MOCK_MAC_DESCRIPTOR),
        });
    });
}

/// Register the mock short MAC algorithm. Idempotent.
pub fn register_mac_short_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_MAC,
            implementation: MAC_ALGORITHM_SHORT_MOCK,
            features: MAC_ALGORITHM_SHORT_MOCK,
            descriptor: Descriptor::Mac(&MOCK_MAC_SHORT_DESCRIPTOR),
        });
    });
}

// ------------------------------- prng ----------------------------------

/// Installable callbacks for the mock PRNG source.
#[derive(Default)]
pub struct PrngMock {
    init: Slot<Thunk0>,
    dispose: Slot<DisposeThunk>,
    read: Slot<Box<dyn Fn(&mut [u8]) -> CryptoResult<()> + Send>>,
}

struct MockPrngEngine {
    mock: Arc<PrngMock>,
}

impl PrngEngine for MockPrngEngine {
    fn read(&mut self, out: &mut [u8]) -> CryptoResult<()> {
        dispatch!(self.mock.read, out)
    }
}

impl Drop for MockPrngEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_prng_engine(
    options: &PrngOptions,
) -> CryptoResult<Box<dyn PrngEngine>> {
    let mock = mock_state::<PrngMock>(options.implementation())?;
    dispatch!(mock.init)?;
    Ok(Box::new(MockPrngEngine { mock }))
}

fn mock_prng_options_init(options: &mut PrngOptions) -> CryptoResult<()> {
    options.set_implementation(Arc::new(PrngMock::default()));
    Ok(())
}

static MOCK_PRNG_DESCRIPTOR: PrngDescriptor = PrngDescriptor {
    source: PRNG_SOURCE_MOCK,
    new_engine: new_mock_prng_engine,
    options_init: Some(mock_prng_options_init),
};

/// Register the mock PRNG source. Idempotent.
pub fn register_prng_source_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_PRNG,
            implementation: PRNG_SOURCE_MOCK,
            features: PRNG_SOURCE_MOCK,
            descriptor: Descriptor::Prng(&MOCK_PRNG_DESCRIPTOR),
        });
    });
}

// ---------------------------- signature --------------------------------

/// Installable callbacks for the mock digital signature algorithm.
#[derive(Default)]
pub struct SignatureMock {
    init: Slot<Thunk0>,
    dispose: Slot<DisposeThunk>,
    sign: Slot<Box<
        dyn Fn(&mut Buffer, &Buffer, &[u8]) -> CryptoResult<()> + Send,
    >>,
    verify:
        Slot<Box<dyn Fn(&Buffer, &Buffer, &[u8]) -> CryptoResult<()> + Send>>,
    keypair_create:
        Slot<Box<dyn Fn(&mut Buffer, &mut Buffer) -> CryptoResult<()> + Send>>,
}

struct MockSignatureEngine {
    mock: Arc<SignatureMock>,
}

impl SignatureEngine for MockSignatureEngine {
    fn sign(
        &mut self,
        signature: &mut Buffer,
        private_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        dispatch!(self.mock.sign, signature, private_key, message)
    }

    fn verify(
        &mut self,
        signature: &Buffer,
        public_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        dispatch!(self.mock.verify, signature, public_key, message)
    }

    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.keypair_create, private_key, public_key)
    }
}

impl Drop for MockSignatureEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_signature_engine(
    options: &SignatureOptions,
) -> CryptoResult<Box<dyn SignatureEngine>> {
    let mock = mock_state::<SignatureMock>(options.implementation())?;
    dispatch!(mock.init)?;
    Ok(Box::new(MockSignatureEngine { mock }))
}

fn mock_signature_options_init(
    options: &mut SignatureOptions,
) -> CryptoResult<()> {
    options.set_implementation(Arc::new(SignatureMock::default()));
    Ok(())
}

static MOCK_SIGNATURE_DESCRIPTOR: SignatureDescriptor =
    SignatureDescriptor {
        algorithm: SIGNATURE_ALGORITHM_MOCK,
        hash_algorithm: 0,
        signature_size: 64,
        private_key_size: 64,
        public_key_size: 32,
        new_engine: new_mock_signature_engine,
        options_init: Some(mock_signature_options_init),
    };

/// Register the mock digital signature algorithm. Idempotent.
pub fn register_digital_signature_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_SIGNATURE,
            implementation: SIGNATURE_ALGORITHM_MOCK,
            features: SIGNATURE_ALGORITHM_MOCK,
            descriptor: Descriptor::Signature(&MOCK_SIGNATURE_DESCRIPTOR),
        });
    });
}

// --------------------------- key agreement ------------------------------

/// Installable callbacks for a mock key agreement algorithm.
#[derive(Default)]
pub struct KeyAgreementMock {
    init: Slot<Thunk0>,
    dispose: Slot<DisposeThunk>,
    long_term_secret_create: Slot<Box<
        dyn Fn(&Buffer, &Buffer, &mut Buffer) -> CryptoResult<()> + Send,
    >>,
    short_term_secret_create: Slot<Box<
        dyn Fn(
                &Buffer,
                &Buffer,
                &Buffer,
                &Buffer,
                &mut Buffer,
            ) -> CryptoResult<()>
            + Send,
    >>,
    keypair_create:
        Slot<Box<dyn Fn(&mut Buffer, &mut Buffer) -> CryptoResult<()> + Send>>,
}

struct MockKeyAgreementEngine {
    mock: Arc<KeyAgreementMock>,
}

impl KeyAgreementEngine for MockKeyAgreementEngine {
    fn long_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        dispatch!(
            self.mock.long_term_secret_create,
            private_key,
            public_key,
            shared
        )
    }

    fn short_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        server_nonce: &Buffer,
        client_nonce: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        dispatch!(
            self.mock.short_term_secret_create,
            private_key,
            public_key,
            server_nonce,
            client_nonce,
            shared
        )
    }

    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.keypair_create, private_key, public_key)
    }
}

impl Drop for MockKeyAgreementEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_key_agreement_engine(
    options: &KeyAgreementOptions,
) -> CryptoResult<Box<dyn KeyAgreementEngine>> {
    let mock = mock_state::<KeyAgreementMock>(options.implementation())?;
    dispatch!(mock.init)?;
    Ok(Box::new(MockKeyAgreementEngine { mock }))
}

fn mock_key_agreement_options_init(
    options: &mut KeyAgreementOptions,
) -> CryptoResult<()> {
    options.set_implementation(Arc::new(KeyAgreementMock::default()));
    Ok(())
}

static MOCK_KEY_AUTH_DESCRIPTOR: KeyAgreementDescriptor =
    KeyAgreementDescriptor {
        algorithm: KEY_AGREEMENT_ALGORITHM_MOCK_AUTH,
        hash_algorithm: 0,
        hmac_algorithm: 0,
        shared_secret_size: 64,
        private_key_size: 32,
        public_key_size: 32,
        minimum_nonce_size: 64,
        short_term_supported: true,
        new_engine: new_mock_key_agreement_engine,
        options_init: Some(mock_key_agreement_options_init),
    };

static MOCK_KEY_CIPHER_DESCRIPTOR: KeyAgreementDescriptor =
    KeyAgreementDescriptor {
        algorithm: KEY_AGREEMENT_ALGORITHM_MOCK_CIPHER,
        hash_algorithm: 0,
        hmac_algorithm: 0,
        shared_secret_size: 32,
        private_key_size: 32,
        public_key_size: 32,
        minimum_nonce_size: 32,
        short_term_supported: true,
        new_engine: new_mock_key_agreement_engine,
        options_init: Some(mock_key_agreement_options_init),
    };

/// Register the mock auth key agreement algorithm. Idempotent.
pub fn register_key_agreement_mock_auth() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_KEY_AGREEMENT,
            implementation: KEY_AGREEMENT_ALGORITHM_MOCK_AUTH,
            features: KEY_AGREEMENT_ALGORITHM_MOCK_AUTH,
            descriptor: Descriptor::KeyAgreement(&MOCK_KEY_AUTH_DESCRIPTOR),
        });
    });
}

/// Register the mock cipher key agreement algorithm. Idempotent.
pub fn register_key_agreement_mock_cipher() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_KEY_AGREEMENT,
            implementation: KEY_AGREEMENT_ALGORITHM_MOCK_CIPHER,
            features: KEY_AGREEMENT_ALGORITHM_MOCK_CIPHER,
            descriptor: Descriptor::KeyAgreement(
                &MOCK_KEY_CIPHER_DESCRIPTOR,
            ),
        });
    });
}

// --------------------------- key derivation -----------------------------

/// Installable callbacks for the mock key derivation algorithm.
#[derive(Default)]
pub struct KeyDerivationMock {
    init: Slot<Thunk0>,
    dispose: Slot<DisposeThunk>,
    derive_key: Slot<Box<
        dyn Fn(&mut Buffer, &Buffer, &Buffer, u32) -> CryptoResult<()>
            + Send,
    >>,
}

struct MockKeyDerivationEngine {
    mock: Arc<KeyDerivationMock>,
}

impl KeyDerivationEngine for MockKeyDerivationEngine {
    fn derive_key(
        &mut self,
        out: &mut Buffer,
        password: &Buffer,
        salt: &Buffer,
        rounds: u32,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.derive_key, out, password, salt, rounds)
    }
}

impl Drop for MockKeyDerivationEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_key_derivation_engine(
    options: &KeyDerivationOptions,
) -> CryptoResult<Box<dyn KeyDerivationEngine>> {
    let mock = mock_state::<KeyDerivationMock>(options.implementation())?;
    dispatch!(mock.init)?;
    Ok(Box::new(MockKeyDerivationEngine { mock }))
}

fn mock_key_derivation_options_init(
    options: &mut KeyDerivationOptions,
) -> CryptoResult<()> {
    options.set_implementation(Arc::new(KeyDerivationMock::default()));
    Ok(())
}

static MOCK_KEY_DERIVATION_DESCRIPTOR: KeyDerivationDescriptor =
    KeyDerivationDescriptor {
        algorithm: KEY_DERIVATION_ALGORITHM_MOCK,
        new_engine: new_mock_key_derivation_engine,
        options_init: Some(mock_key_derivation_options_init),
    };

/// Register the mock key derivation algorithm. Idempotent.
pub fn register_key_derivation_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_KEY_DERIVATION,
            implementation: KEY_DERIVATION_ALGORITHM_MOCK,
            features: KEY_DERIVATION_ALGORITHM_MOCK,
            descriptor: Descriptor::KeyDerivation(
                &MOCK_KEY_DERIVATION_DESCRIPTOR,
            ),
        });
    });
}

// ------------------------------- block ----------------------------------

/// Installable callbacks for the mock block cipher.
#[derive(Default)]
pub struct BlockMock {
    init: Slot<Box<dyn Fn(&Buffer, bool) -> CryptoResult<()> + Send>>,
    dispose: Slot<DisposeThunk>,
    encrypt: Slot<Box<
        dyn Fn(&[u8], &[u8], &mut [u8]) -> CryptoResult<()> + Send,
    >>,
    decrypt: Slot<Box<
        dyn Fn(&[u8], &[u8], &mut [u8]) -> CryptoResult<()> + Send,
    >>,
}

struct MockBlockEngine {
    mock: Arc<BlockMock>,
}

impl BlockEngine for MockBlockEngine {
    fn encrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()> {
        dispatch!(self.mock.encrypt, iv, input, output)
    }

    fn decrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()> {
        dispatch!(self.mock.decrypt, iv, input, output)
    }
}

impl Drop for MockBlockEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_block_engine(
    options: &BlockOptions,
    key: &Buffer,
    encrypt: bool,
) -> CryptoResult<Box<dyn BlockEngine>> {
    let mock = mock_state::<BlockMock>(options.implementation())?;
    dispatch!(mock.init, key, encrypt)?;
    Ok(Box::new(MockBlockEngine { mock }))
}

fn mock_block_options_init(options: &mut BlockOptions) -> CryptoResult<()> {
    options.set_implementation(Arc::new(BlockMock::default()));
    Ok(())
}

static MOCK_BLOCK_DESCRIPTOR: BlockDescriptor = BlockDescriptor {
    algorithm: BLOCK_ALGORITHM_MOCK,
    key_size: 32,
    iv_size: 16,
    maximum_message_size: u64::MAX,
    new_engine: new_mock_block_engine,
    options_init: Some(mock_block_options_init),
};

/// Register the mock block cipher. Idempotent.
pub fn register_block_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_BLOCK_CIPHER,
            implementation: BLOCK_ALGORITHM_MOCK,
            features: BLOCK_ALGORITHM_MOCK,
            descriptor: Descriptor::BlockCipher(&MOCK_BLOCK_DESCRIPTOR),
        });
    });
}

// ------------------------------- stream ---------------------------------

/// Installable callbacks for the mock stream cipher.
#[derive(Default)]
pub struct StreamMock {
    init: Slot<Box<dyn Fn(&Buffer) -> CryptoResult<()> + Send>>,
    dispose: Slot<DisposeThunk>,
    start_encryption: Slot<Box<
        dyn Fn(&[u8], &mut [u8], &mut usize) -> CryptoResult<()> + Send,
    >>,
    continue_encryption:
        Slot<Box<dyn Fn(&[u8], usize) -> CryptoResult<()> + Send>>,
    start_decryption:
        Slot<Box<dyn Fn(&[u8], &mut usize) -> CryptoResult<()> + Send>>,
    continue_decryption:
        Slot<Box<dyn Fn(&[u8], usize) -> CryptoResult<()> + Send>>,
    encrypt: Slot<Box<
        dyn Fn(&[u8], &mut [u8], &mut usize) -> CryptoResult<()> + Send,
    >>,
    decrypt: Slot<Box<
        dyn Fn(&[u8], &mut [u8], &mut usize) -> CryptoResult<()> + Send,
    >>,
}

struct MockStreamEngine {
    mock: Arc<StreamMock>,
}

impl StreamEngine for MockStreamEngine {
    fn start_encryption(
        &mut self,
        iv: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.start_encryption, iv, output, offset)
    }

    fn continue_encryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.continue_encryption, iv, offset)
    }

    fn start_decryption(
        &mut self,
        input: &[u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.start_decryption, input, offset)
    }

    fn continue_decryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.continue_decryption, iv, offset)
    }

    fn encrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.encrypt, input, output, offset)
    }

    fn decrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        dispatch!(self.mock.decrypt, input, output, offset)
    }
}

impl Drop for MockStreamEngine {
    fn drop(&mut self) {
        dispatch_dispose!(self.mock.dispose);
    }
}

fn new_mock_stream_engine(
    options: &StreamOptions,
    key: &Buffer,
) -> CryptoResult<Box<dyn StreamEngine>> {
    let mock = mock_state::<StreamMock>(options.implementation())?;
    dispatch!(mock.init, key)?;
    Ok(Box::new(MockStreamEngine { mock }))
}

fn mock_stream_options_init(
    options: &mut StreamOptions,
) -> CryptoResult<()> {
    options.set_implementation(Arc::new(StreamMock::default()));
    Ok(())
}

static MOCK_STREAM_DESCRIPTOR: StreamDescriptor = StreamDescriptor {
    algorithm: STREAM_ALGORITHM_MOCK,
    key_size: 32,
    iv_size: 16,
    maximum_message_size: u64::MAX,
    new_engine: new_mock_stream_engine,
    options_init: Some(mock_stream_options_init),
};

/// Register the mock stream cipher. Idempotent.
pub fn register_stream_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_STREAM_CIPHER,
            implementation: STREAM_ALGORITHM_MOCK,
            features: STREAM_ALGORITHM_MOCK,
            descriptor: Descriptor::StreamCipher(&MOCK_STREAM_DESCRIPTOR),
        });
    });
}

// ----------------------------- mock suite -------------------------------

static MOCK_SUITE_DESCRIPTOR: SuiteDescriptor = SuiteDescriptor {
    suite_id: SUITE_MOCK,
    hash_alg: HASH_ALGORITHM_MOCK,
    sign_alg: SIGNATURE_ALGORITHM_MOCK,
    prng_src: PRNG_SOURCE_MOCK,
    mac_alg: MAC_ALGORITHM_MOCK,
    mac_short_alg: Some(MAC_ALGORITHM_SHORT_MOCK),
    key_auth_alg: KEY_AGREEMENT_ALGORITHM_MOCK_AUTH,
    key_cipher_alg: KEY_AGREEMENT_ALGORITHM_MOCK_CIPHER,
    key_derivation_alg: Some(KEY_DERIVATION_ALGORITHM_MOCK),
    key_derivation_hmac_alg: MAC_ALGORITHM_SHORT_MOCK,
    block_cipher_alg: BLOCK_ALGORITHM_MOCK,
    stream_cipher_alg: STREAM_ALGORITHM_MOCK,
    hash_init: suite::suite_hash_init,
    sign_init: suite::suite_sign_init,
    prng_init: suite::suite_prng_init,
    mac_init: suite::suite_mac_init,
    mac_short_init: suite::suite_mac_short_init,
    key_auth_init: suite::suite_key_auth_init,
    key_cipher_init: suite::suite_key_cipher_init,
    key_derivation_init: suite::suite_key_derivation_init,
    block_init: suite::suite_block_init,
    stream_init: suite::suite_stream_init,
};

/// Register the mock crypto suite and every mock algorithm it selects.
/// Idempotent.
pub fn register_mock() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        register_hash_mock();
        register_prng_source_mock();
        register_mac_mock();
        register_mac_short_mock();
        register_digital_signature_mock();
        register_key_agreement_mock_auth();
        register_key_agreement_mock_cipher();
        register_key_derivation_mock();
        register_block_mock();
        register_stream_mock();

        registry::register(Registration {
            interface: INTERFACE_SUITE,
            implementation: SUITE_MOCK,
            features: SUITE_MOCK,
            descriptor: Descriptor::Suite(&MOCK_SUITE_DESCRIPTOR),
        });
    });
}

/// Register and initialize mock suite options in one step.
pub fn mock_suite_options_init(
    alloc: &SharedAllocator,
) -> CryptoResult<SuiteOptions> {
    register_mock();
    SuiteOptions::init(alloc, SUITE_MOCK)
}

// --------------------------- install helpers ----------------------------

/// Generate an `add_mock_*` installer for one mocked method.
macro_rules! add_mock_fn {
    ($(#[$doc:meta])* $name:ident, $mock_ty:ty, $options:ident, $slot:ident,
     ($($arg:ty),*)) => {
        $(#[$doc])*
        pub fn $name<F>(&self, callback: F) -> CryptoResult<()>
        where
            F: Fn($($arg),*) -> CryptoResult<()> + Send + 'static,
        {
            let mock = mock_state::<$mock_ty>(self.$options()?)?;
            *mock.$slot.lock().expect("mock slot lock poisoned") =
                Some(Box::new(callback));
            Ok(())
        }
    };
}

/// Generate an `add_mock_*` installer for one disposal hook.
macro_rules! add_mock_dispose_fn {
    ($(#[$doc:meta])* $name:ident, $mock_ty:ty, $options:ident) => {
        $(#[$doc])*
        pub fn $name<F>(&self, callback: F) -> CryptoResult<()>
        where
            F: Fn() + Send + 'static,
        {
            let mock = mock_state::<$mock_ty>(self.$options()?)?;
            *mock.dispose.lock().expect("mock slot lock poisoned") =
                Some(Box::new(callback));
            Ok(())
        }
    };
}

impl SuiteOptions {
    fn hash_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.hash_options().implementation())
    }

    fn prng_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.prng_options().implementation())
    }

    fn sign_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.sign_options().implementation())
    }

    fn mac_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.mac_options().implementation())
    }

    fn mac_short_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self
            .mac_short_options()
            .ok_or(CryptoError::MockNotAdded)?
            .implementation())
    }

    fn key_auth_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.key_auth_options().implementation())
    }

    fn key_cipher_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.key_cipher_options().implementation())
    }

    fn key_derivation_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self
            .key_derivation_options()
            .ok_or(CryptoError::MockNotAdded)?
            .implementation())
    }

    fn block_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.block_options().implementation())
    }

    fn stream_mock_tail(
        &self,
    ) -> CryptoResult<Option<&Arc<dyn Any + Send + Sync>>> {
        Ok(self.stream_options().implementation())
    }

    // hash
    add_mock_fn!(
        /// Mock the hash init method.
        add_mock_hash_init, HashMock, hash_mock_tail, init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the hash dispose method.
        add_mock_hash_dispose, HashMock, hash_mock_tail
    );
    add_mock_fn!(
        /// Mock the hash digest method.
        add_mock_hash_digest, HashMock, hash_mock_tail, digest, (&[u8])
    );
    add_mock_fn!(
        /// Mock the hash finalize method.
        add_mock_hash_finalize, HashMock, hash_mock_tail, finalize,
        (&mut Buffer)
    );

    // prng
    add_mock_fn!(
        /// Mock the PRNG init method.
        add_mock_prng_init, PrngMock, prng_mock_tail, init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the PRNG dispose method.
        add_mock_prng_dispose, PrngMock, prng_mock_tail
    );
    add_mock_fn!(
        /// Mock the PRNG read method.
        add_mock_prng_read, PrngMock, prng_mock_tail, read, (&mut [u8])
    );

    // signature
    add_mock_fn!(
        /// Mock the digital signature init method.
        add_mock_digital_signature_init, SignatureMock, sign_mock_tail,
        init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the digital signature dispose method.
        add_mock_digital_signature_dispose, SignatureMock, sign_mock_tail
    );
    add_mock_fn!(
        /// Mock the digital signature sign method.
        add_mock_digital_signature_sign, SignatureMock, sign_mock_tail,
        sign, (&mut Buffer, &Buffer, &[u8])
    );
    add_mock_fn!(
        /// Mock the digital signature verify method.
        add_mock_digital_signature_verify, SignatureMock, sign_mock_tail,
        verify, (&Buffer, &Buffer, &[u8])
    );
    add_mock_fn!(
        /// Mock the digital signature keypair creation method.
        add_mock_digital_signature_keypair_create, SignatureMock,
        sign_mock_tail, keypair_create, (&mut Buffer, &mut Buffer)
    );

    // mac (long)
    add_mock_fn!(
        /// Mock the MAC init method.
        add_mock_mac_init, MacMock, mac_mock_tail, init, (&Buffer)
    );
    add_mock_dispose_fn!(
        /// Mock the MAC dispose method.
        add_mock_mac_dispose, MacMock, mac_mock_tail
    );
    add_mock_fn!(
        /// Mock the MAC digest method.
        add_mock_mac_digest, MacMock, mac_mock_tail, digest, (&[u8])
    );
    add_mock_fn!(
        /// Mock the MAC finalize method.
        add_mock_mac_finalize, MacMock, mac_mock_tail, finalize,
        (&mut Buffer)
    );

    // mac (short)
    add_mock_fn!(
        /// Mock the short MAC init method.
        add_mock_mac_short_init, MacMock, mac_short_mock_tail, init,
        (&Buffer)
    );
    add_mock_dispose_fn!(
        /// Mock the short MAC dispose method.
        add_mock_mac_short_dispose, MacMock, mac_short_mock_tail
    );
    add_mock_fn!(
        /// Mock the short MAC digest method.
        add_mock_mac_short_digest, MacMock, mac_short_mock_tail, digest,
        (&[u8])
    );
    add_mock_fn!(
        /// Mock the short MAC finalize method.
        add_mock_mac_short_finalize, MacMock, mac_short_mock_tail,
        finalize, (&mut Buffer)
    );

    // key agreement (auth)
    add_mock_fn!(
        /// Mock the auth key agreement init method.
        add_mock_auth_key_agreement_init, KeyAgreementMock,
        key_auth_mock_tail, init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the auth key agreement dispose method.
        add_mock_auth_key_agreement_dispose, KeyAgreementMock,
        key_auth_mock_tail
    );
    add_mock_fn!(
        /// Mock the auth key agreement long-term secret method.
        add_mock_auth_key_agreement_long_term_secret_create,
        KeyAgreementMock, key_auth_mock_tail, long_term_secret_create,
        (&Buffer, &Buffer, &mut Buffer)
    );
    add_mock_fn!(
        /// Mock the auth key agreement short-term secret method.
        add_mock_auth_key_agreement_short_term_secret_create,
        KeyAgreementMock, key_auth_mock_tail, short_term_secret_create,
        (&Buffer, &Buffer, &Buffer, &Buffer, &mut Buffer)
    );
    add_mock_fn!(
        /// Mock the auth key agreement keypair creation method.
        add_mock_auth_key_agreement_keypair_create, KeyAgreementMock,
        key_auth_mock_tail, keypair_create, (&mut Buffer, &mut Buffer)
    );

    // key agreement (cipher)
    add_mock_fn!(
        /// Mock the cipher key agreement init method.
        add_mock_cipher_key_agreement_init, KeyAgreementMock,
        key_cipher_mock_tail, init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the cipher key agreement dispose method.
        add_mock_cipher_key_agreement_dispose, KeyAgreementMock,
        key_cipher_mock_tail
    );
    add_mock_fn!(
        /// Mock the cipher key agreement long-term secret method.
        add_mock_cipher_key_agreement_long_term_secret_create,
        KeyAgreementMock, key_cipher_mock_tail, long_term_secret_create,
        (&Buffer, &Buffer, &mut Buffer)
    );
    add_mock_fn!(
        /// Mock the cipher key agreement short-term secret method.
        add_mock_cipher_key_agreement_short_term_secret_create,
        KeyAgreementMock, key_cipher_mock_tail, short_term_secret_create,
        (&Buffer, &Buffer, &Buffer, &Buffer, &mut Buffer)
    );
    add_mock_fn!(
        /// Mock the cipher key agreement keypair creation method.
        add_mock_cipher_key_agreement_keypair_create, KeyAgreementMock,
        key_cipher_mock_tail, keypair_create, (&mut Buffer, &mut Buffer)
    );

    // key derivation
    add_mock_fn!(
        /// Mock the key derivation init method.
        add_mock_key_derivation_init, KeyDerivationMock,
        key_derivation_mock_tail, init, ()
    );
    add_mock_dispose_fn!(
        /// Mock the key derivation dispose method.
        add_mock_key_derivation_dispose, KeyDerivationMock,
        key_derivation_mock_tail
    );
    add_mock_fn!(
        /// Mock the key derivation derive-key method.
        add_mock_key_derivation_derive_key, KeyDerivationMock,
        key_derivation_mock_tail, derive_key,
        (&mut Buffer, &Buffer, &Buffer, u32)
    );

    // block cipher
    add_mock_fn!(
        /// Mock the block cipher init method.
        add_mock_block_init, BlockMock, block_mock_tail, init,
        (&Buffer, bool)
    );
    add_mock_dispose_fn!(
        /// Mock the block cipher dispose method.
        add_mock_block_dispose, BlockMock, block_mock_tail
    );
    add_mock_fn!(
        /// Mock the block cipher encrypt method.
        add_mock_block_encrypt, BlockMock, block_mock_tail, encrypt,
        (&[u8], &[u8], &mut [u8])
    );
    add_mock_fn!(
        /// Mock the block cipher decrypt method.
        add_mock_block_decrypt, BlockMock, block_mock_tail, decrypt,
        (&[u8], &[u8], &mut [u8])
    );

    // stream cipher
    add_mock_fn!(
        /// Mock the stream cipher init method.
        add_mock_stream_init, StreamMock, stream_mock_tail, init, (&Buffer)
    );
    add_mock_dispose_fn!(
        /// Mock the stream cipher dispose method.
        add_mock_stream_dispose, StreamMock, stream_mock_tail
    );
    add_mock_fn!(
        /// Mock the stream cipher start-encryption method.
        add_mock_stream_start_encryption, StreamMock, stream_mock_tail,
        start_encryption, (&[u8], &mut [u8], &mut usize)
    );
    add_mock_fn!(
        /// Mock the stream cipher continue-encryption method.
        add_mock_stream_continue_encryption, StreamMock, stream_mock_tail,
        continue_encryption, (&[u8], usize)
    );
    add_mock_fn!(
        /// Mock the stream cipher start-decryption method.
        add_mock_stream_start_decryption, StreamMock, stream_mock_tail,
        start_decryption, (&[u8], &mut usize)
    );
    add_mock_fn!(
        /// Mock the stream cipher continue-decryption method.
        add_mock_stream_continue_decryption, StreamMock, stream_mock_tail,
        continue_decryption, (&[u8], usize)
    );
    add_mock_fn!(
        /// Mock the stream cipher encrypt method.
        add_mock_stream_encrypt, StreamMock, stream_mock_tail, encrypt,
        (&[u8], &mut [u8], &mut usize)
    );
    add_mock_fn!(
        /// Mock the stream cipher decrypt method.
        add_mock_stream_decrypt, StreamMock, stream_mock_tail, decrypt,
        (&[u8], &mut [u8], &mut usize)
    );
}
